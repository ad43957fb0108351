use crate::handlers::{admin, locations, public, ws};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/routes", get(public::list_routes))
        .route("/routes/{route_id}", get(public::get_route))
        .route("/trips/active", get(public::active_trips))
        // Static segment must sit above the {bus_id} captures.
        .route("/buses/nearby", get(public::nearby_buses))
        .route("/buses/{bus_id}/location", get(public::latest_location))
        .route(
            "/buses/{bus_id}/location/history",
            get(public::location_history),
        )
        .route("/locations/active", get(public::active_locations));

    let admin_routes = Router::new()
        .route("/buses", post(admin::create_bus))
        .route("/routes", post(admin::create_route))
        .route("/trips", post(admin::create_trip))
        .route("/trips/{trip_id}/status", patch(admin::update_trip_status))
        .route("/locations", post(locations::ingest_location))
        .route("/dashboard", get(admin::dashboard));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .nest("/api/public", public_routes)
        .nest("/api/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "success",
        "data": {
            "service": "fleet-tracking-api",
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::config::{ApiConfig, DEFAULT_JWT_SECRET};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(&ApiConfig::default()).unwrap();
        create_router(state)
    }

    fn bearer() -> String {
        let claims = Claims {
            sub: "ops-console".to_string(),
            exp: 4_102_444_800, // 2100-01-01
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(DEFAULT_JWT_SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::AUTHORIZATION, bearer())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_admin_requires_bearer_token() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/buses")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_rejected_token_is_401() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/admin/dashboard")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_ingest_body_is_400_validation() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/locations")
            .header(header::AUTHORIZATION, bearer())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_full_flow_register_ingest_read() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/buses",
                serde_json::json!({
                    "busNumber": "NB-1001",
                    "registrationNumber": "WP-NA-1234",
                    "operator": "SLTB",
                    "serviceType": "Luxury",
                    "capacity": { "seated": 54, "standing": 10 }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bus = body_json(response).await["data"]["bus"].clone();
        // The response echoes the request's field casing.
        assert_eq!(bus["busNumber"], "NB-1001");
        assert!(bus.get("bus_number").is_none());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/routes",
                serde_json::json!({
                    "routeNumber": "R001",
                    "name": "Colombo - Kandy",
                    "origin": "Colombo",
                    "destination": "Kandy",
                    "distance": 115.0,
                    "estimatedDuration": 210
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let route = body_json(response).await["data"]["route"].clone();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/trips",
                serde_json::json!({
                    "tripNumber": "TRIP-001",
                    "bus": bus["id"],
                    "route": route["id"],
                    "direction": "outbound",
                    "departureTime": "2026-08-25T06:00:00Z",
                    "arrivalTime": "2026-08-25T09:30:00Z",
                    "status": "in_progress"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/locations",
                serde_json::json!({
                    "busId": "NB-1001",
                    "latitude": 6.9271,
                    "longitude": 79.8612,
                    "speed": 45.0
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["location"]["bus"]["busNumber"], "NB-1001");
        assert_eq!(body["data"]["location"]["trip"]["tripNumber"], "TRIP-001");
        assert_eq!(
            body["data"]["location"]["trip"]["route"]["routeNumber"],
            "R001"
        );

        let response = app
            .clone()
            .oneshot(get("/api/public/buses/NB-1001/location"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["location"]["latitude"], 6.9271);

        let response = app
            .clone()
            .oneshot(get(
                "/api/public/buses/nearby?latitude=6.9271&longitude=79.8612&radius=5000",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["buses"][0]["distanceKm"], 0.0);

        let response = app
            .clone()
            .oneshot(get("/api/public/locations/active"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["results"], 1);

        let response = app.oneshot(get("/api/public/trips/active")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["trips"][0]["trip"]["tripNumber"], "TRIP-001");
    }

    #[tokio::test]
    async fn test_non_numeric_speed_is_400_validation() {
        let response = app()
            .oneshot(post_json(
                "/api/admin/locations",
                serde_json::json!({
                    "busId": "NB-1001",
                    "latitude": 6.9271,
                    "longitude": 79.8612,
                    "speed": "abc"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_ingest_without_active_trip_is_400() {
        let app = app();
        app.clone()
            .oneshot(post_json(
                "/api/admin/buses",
                serde_json::json!({
                    "busNumber": "NB-2002",
                    "registrationNumber": "WP-NA-5678",
                    "operator": "Private",
                    "serviceType": "Normal",
                    "capacity": { "seated": 40 }
                }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/admin/locations",
                serde_json::json!({
                    "busId": "NB-2002",
                    "latitude": 6.9271,
                    "longitude": 79.8612
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NO_ACTIVE_TRIP");
    }

    #[tokio::test]
    async fn test_unknown_bus_location_is_404() {
        let response = app()
            .oneshot(get("/api/public/buses/NB-9999/location"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
