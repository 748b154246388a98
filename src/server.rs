//! JSON endpoints over [`AppState`]. Every handler is a read-only query; the
//! state is built once before the server starts.

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::map::Metric;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct MapQuery {
    metric: Option<Metric>,
    points: Option<bool>,
}

/// Registers the routes; shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/status", web::get().to(status_handler))
        .route("/api/summary", web::get().to(summary_handler))
        .route("/api/departments", web::get().to(departments_handler))
        .route(
            "/api/departments/{department}/levels",
            web::get().to(levels_handler),
        )
        .route("/api/map", web::get().to(map_handler));
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let data = web::Data::new(state);
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((host, port))
        .with_context(|| format!("binding {host}:{port}"))?;
    info!(host, port, "dashboard API listening");
    server.run().await?;
    Ok(())
}

async fn status_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.status())
}

async fn summary_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.summary())
}

async fn departments_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.departments())
}

async fn levels_handler(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(state.filter_by_department(&path.into_inner()))
}

async fn map_handler(state: web::Data<AppState>, query: web::Query<MapQuery>) -> HttpResponse {
    let metric = query.metric.unwrap_or_default();
    let show_points = query.points.unwrap_or(true);
    HttpResponse::Ok().json(state.build_map(metric, show_points))
}

#[cfg(test)]
mod tests {
    use actix_web::test;
    use enrollment::{EducationRecord, Level};
    use serde_json::{json, Value};

    use super::*;
    use crate::error::GeoError;
    use crate::map::MapView;

    fn records() -> Vec<EducationRecord> {
        vec![
            EducationRecord {
                id: "1".to_string(),
                department: "NARIÑO".to_string(),
                latitude: 1.25,
                longitude: -77.25,
                level: Level::Pregrado,
                enrollment: 75,
                institution: "Universidad C".to_string(),
            },
            EducationRecord {
                id: "2".to_string(),
                department: "NARIÑO".to_string(),
                latitude: 1.25,
                longitude: -77.25,
                level: Level::Posgrado,
                enrollment: 25,
                institution: "Universidad C".to_string(),
            },
        ]
    }

    fn offline_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            records(),
            Err(GeoError::NoRegionKeyFound),
            MapView::default(),
        ))
    }

    #[actix_web::test]
    async fn status_reports_missing_geo_data() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["geo_loaded"], json!(false));
        assert_eq!(body["message"], json!("No hay etiqueta de departamento disponible"));
    }

    #[actix_web::test]
    async fn levels_for_percent_encoded_department() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/departments/NARI%C3%91O/levels")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([
                {"Nivel": "Posgrado", "Estudiantes": 25},
                {"Nivel": "Pregrado", "Estudiantes": 75}
            ])
        );
    }

    #[actix_web::test]
    async fn unknown_department_is_an_empty_list() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/departments/CAUCA/levels")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn map_without_geo_data_is_an_error_payload() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/map?metric=NumInstituciones&points=false")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["error"].is_string());
        assert_eq!(body["choropleth"], Value::Null);
    }

    #[actix_web::test]
    async fn summary_and_departments() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/summary").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_students"], json!(100));

        let req = test::TestRequest::get().uri("/api/departments").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!(["NARIÑO"]));
    }
}
