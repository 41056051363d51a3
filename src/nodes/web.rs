// Web control node: HTTP panel with camera stream -> motors
//
// Each action route applies its intent immediately. The page sends `/stop`
// when a button is released, so motion only lasts while a button is held.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::{retry_until_ok, shutdown_signal};
use crate::config::CONNECT_RETRY_DELAY;
use crate::messages::Intent;
use crate::motor::DifferentialDrive;

const CONTROL_PANEL_HTML: &str = include_str!("control_panel.html");

#[derive(Clone)]
struct WebState {
    drive: Arc<Mutex<DifferentialDrive>>,
    page: Arc<str>,
}

/// Render the control page for the given camera stream
pub fn control_page(camera_url: &str) -> String {
    CONTROL_PANEL_HTML.replace("{{CAMERA_URL}}", &escape_attr(camera_url))
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Routes: `/` plus one action route per intent. Anything else is a 404.
pub fn router(drive: Arc<Mutex<DifferentialDrive>>, camera_url: &str) -> Router {
    let state = WebState {
        drive,
        page: control_page(camera_url).into(),
    };

    let mut app = Router::new().route("/", get(index));
    for intent in Intent::ALL {
        let path = format!("/{}", intent.route());
        app = app.route(
            &path,
            get(move |State(state): State<WebState>| async move { act(&state, intent) }),
        );
    }
    app.with_state(state)
}

async fn index(State(state): State<WebState>) -> Html<String> {
    Html(state.page.to_string())
}

fn act(state: &WebState, intent: Intent) -> Result<&'static str, (StatusCode, String)> {
    debug!("HTTP {:?}", intent);
    let mut drive = state.drive.lock().map_err(|_| {
        error!("Drive lock poisoned");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "drive unavailable".to_string(),
        )
    })?;

    drive.apply(intent).map_err(|e| {
        error!("Failed to apply {:?}: {}", intent, e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok("OK")
}

pub async fn run(
    drive: DifferentialDrive,
    port: u16,
    camera_url: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let drive = Arc::new(Mutex::new(drive));
    let app = router(Arc::clone(&drive), camera_url);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = retry_until_ok("HTTP bind", CONNECT_RETRY_DELAY, || {
        TcpListener::bind(addr)
    })
    .await;

    info!("Robot controller ready at http://{}", addr);
    info!("Camera stream: {}", camera_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(mut drive) = drive.lock() {
        drive.stop()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::{Direction, SimWheel, SpeedProfile, Wheel, WheelWrite};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct SimApp {
        app: Router,
        left: SimWheel,
        right: SimWheel,
        // Keeps the drive alive so its stop-on-drop never lands mid-test
        drive: Arc<Mutex<DifferentialDrive>>,
    }

    fn sim_app() -> SimApp {
        let left = SimWheel::new(Wheel::Left);
        let right = SimWheel::new(Wheel::Right);
        let drive = Arc::new(Mutex::new(DifferentialDrive::new(
            Box::new(left.clone()),
            Box::new(right.clone()),
            SpeedProfile::full_speed(),
        )));
        let app = router(Arc::clone(&drive), "http://cam.local/stream");
        SimApp {
            app,
            left,
            right,
            drive,
        }
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_embeds_camera() {
        let sim = sim_app();
        let (status, body) = get_path(sim.app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<img src="http://cam.local/stream">"#));
        assert!(body.contains("fetch('/stop')"));
    }

    #[tokio::test]
    async fn test_left_route_turns_in_place() {
        let sim = sim_app();
        let (status, body) = get_path(sim.app.clone(), "/left").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert_eq!(
            sim.left.writes(),
            vec![WheelWrite::Direction(Direction::Reverse), WheelWrite::Duty(255)]
        );
        assert_eq!(
            sim.right.writes(),
            vec![WheelWrite::Direction(Direction::Forward), WheelWrite::Duty(255)]
        );
    }

    #[tokio::test]
    async fn test_every_action_route_answers_ok() {
        for intent in Intent::ALL {
            let sim = sim_app();
            let (status, body) = get_path(sim.app.clone(), &format!("/{}", intent.route())).await;
            assert_eq!(status, StatusCode::OK, "{intent:?}");
            assert_eq!(body, "OK");
            assert!(!sim.left.writes().is_empty());
            assert_eq!(sim.drive.lock().unwrap().last_intent(), Some(intent));
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let sim = sim_app();
        let (status, _) = get_path(sim.app.clone(), "/spin").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(sim.left.writes().is_empty());
        assert!(sim.right.writes().is_empty());
    }

    #[test]
    fn test_camera_url_escaped() {
        let page = control_page(r#"x"><script>"#);
        assert!(page.contains("x&quot;&gt;&lt;script&gt;"));
    }
}
