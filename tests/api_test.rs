//! API integration tests
//!
//! Exercises the REST surface against an in-memory database, a stub model and
//! a stub address lookup.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use sea_orm_migration::prelude::MigratorTrait;
use serde_json::{json, Value};
use tempfile::TempDir;

use geoprompt::database::{establish_connection, migrations::Migrator};
use geoprompt::errors::{GeocodeError, LlmError};
use geoprompt::pipeline::{AddressLookup, GeocodeHit, LlmClient};
use geoprompt::server::app::{create_app, AppState};
use geoprompt::services::{AuthService, Role};
use geoprompt::AppConfig;

const ADMIN_EMAIL: &str = "admin@region.fr";
const USER_EMAIL: &str = "agent@region.fr";
const PASSWORD: &str = "motdepasse-sur";

/// Answers by keyword in the user prompt.
struct ScriptedLlm;

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        if user.contains("panne") {
            return Err(LlmError::MissingApiKey);
        }
        if user.contains("population") {
            return Ok(json!({
                "type": "choroplèthe",
                "title": "Population",
                "dataLevel": "departements",
                "joinKey": "code",
                "colors": ["#ffffcc", "#800026"]
            })
            .to_string());
        }
        Ok(format!(
            "```json\n{}\n```",
            json!({
                "type": "geocodage",
                "title": "Mairies",
                "locations": [
                    { "address": "Mairie de Dijon" },
                    { "address": "Mairie de Besançon", "latitude": 47.2378, "longitude": 6.0241 }
                ]
            })
        ))
    }
}

struct FixedLookup;

#[async_trait]
impl AddressLookup for FixedLookup {
    async fn lookup(&self, query: &str) -> Result<GeocodeHit, GeocodeError> {
        Ok(GeocodeHit {
            latitude: 47.3220,
            longitude: 5.0415,
            label: query.to_string(),
        })
    }
}

struct TestContext {
    server: TestServer,
    admin_token: String,
    user_token: String,
    _data_dir: TempDir,
}

fn write_layers(dir: &TempDir) -> Result<()> {
    let departements = json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "code": "21", "nom": "Côte-d'Or" },
                "geometry": { "type": "Point", "coordinates": [4.77, 47.42] }
            },
            {
                "type": "Feature",
                "properties": { "code": "25", "nom": "Doubs" },
                "geometry": { "type": "Point", "coordinates": [6.36, 47.17] }
            }
        ]
    });
    std::fs::write(dir.path().join("departements.geojson"), departements.to_string())?;
    std::fs::write(
        dir.path().join("communes.geojsonl"),
        concat!(
            r#"{"type":"Feature","properties":{"code":"21231"},"geometry":{"type":"Point","coordinates":[5.04,47.32]}}"#,
            "\n"
        ),
    )?;
    Ok(())
}

async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["sessionId"].as_str().unwrap().to_string()
}

async fn setup() -> Result<TestContext> {
    let data_dir = TempDir::new()?;
    write_layers(&data_dir)?;

    let db = establish_connection("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;

    let auth = AuthService::new(db.clone());
    auth.create_user(ADMIN_EMAIL, "Admin", PASSWORD, Role::Admin).await?;
    auth.create_user(USER_EMAIL, "Agent", PASSWORD, Role::User).await?;

    let mut values = HashMap::new();
    values.insert(
        "GEOPROMPT_DATA_DIR".to_string(),
        data_dir.path().display().to_string(),
    );
    let config = AppConfig::from_map(&values);

    let state = AppState::new(db, Arc::new(ScriptedLlm), Arc::new(FixedLookup), &config);
    let app = create_app(state, None).await?;
    let server = TestServer::new(app)?;

    let admin_token = login(&server, ADMIN_EMAIL).await;
    let user_token = login(&server, USER_EMAIL).await;

    Ok(TestContext {
        server,
        admin_token,
        user_token,
        _data_dir: data_dir,
    })
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let ctx = setup().await?;

    let response = ctx.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "geoprompt");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_login_rejects_wrong_password_and_missing_token() -> Result<()> {
    let ctx = setup().await?;

    let response = ctx
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": "mauvais-mot" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = ctx.server.get("/api/v1/documents").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert!(body["error"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_logout_invalidates_session() -> Result<()> {
    let ctx = setup().await?;
    let (name, value) = bearer(&ctx.user_token);

    let response = ctx
        .server
        .post("/api/v1/auth/logout")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = ctx.server.get("/api/v1/maps").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_documents_crud_requires_admin() -> Result<()> {
    let ctx = setup().await?;
    let (admin_h, admin_v) = bearer(&ctx.admin_token);
    let (user_h, user_v) = bearer(&ctx.user_token);

    let payload = json!({
        "name": "Guide des EPCI",
        "description": "Liste des intercommunalités",
        "usagePrompt": "Utiliser pour les questions d'intercommunalité",
        "tags": ["epci", "EPCI", "territoire"],
        "embeddingProcessed": true
    });

    let response = ctx
        .server
        .post("/api/v1/documents")
        .add_header(user_h.clone(), user_v.clone())
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .post("/api/v1/documents")
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let document: Value = response.json();
    let id = document["id"].as_i64().unwrap();
    assert_eq!(document["name"], "Guide des EPCI");
    assert_eq!(document["is_active"], true);

    let response = ctx
        .server
        .put(&format!("/api/v1/documents/{}", id))
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&json!({ "description": "Mise à jour" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let document: Value = response.json();
    assert_eq!(document["description"], "Mise à jour");

    let response = ctx
        .server
        .delete(&format!("/api/v1/documents/{}", id))
        .add_header(admin_h.clone(), admin_v.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let document: Value = response.json();
    assert_eq!(document["is_active"], false);

    let response = ctx
        .server
        .get("/api/v1/documents/9999")
        .add_header(user_h, user_v)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_generate_geocodage_records_log() -> Result<()> {
    let ctx = setup().await?;
    let (user_h, user_v) = bearer(&ctx.user_token);
    let (admin_h, admin_v) = bearer(&ctx.admin_token);

    let response = ctx
        .server
        .post("/api/v1/generate")
        .add_header(user_h.clone(), user_v.clone())
        .json(&json!({ "prompt": "Affiche les mairies" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let result: Value = response.json();
    assert_eq!(result["type"], "geocodage");
    assert_eq!(result["parseError"], false);
    let features = result["geojson"]["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["name"], "Mairie de Dijon");
    assert_eq!(features[1]["geometry"]["coordinates"], json!([6.0241, 47.2378]));

    let log_id = result["logId"].as_i64().unwrap();
    let response = ctx
        .server
        .get(&format!("/api/v1/logs/{}", log_id))
        .add_header(user_h.clone(), user_v.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let log: Value = response.json();
    assert_eq!(log["success"], true);
    assert_eq!(log["model_name"], "scripted-model");

    let response = ctx
        .server
        .put(&format!("/api/v1/logs/{}/validation", log_id))
        .add_header(user_h, user_v)
        .json(&json!({ "validated": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .put(&format!("/api/v1/logs/{}/validation", log_id))
        .add_header(admin_h, admin_v)
        .json(&json!({ "validated": true, "notes": "Conforme" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let log: Value = response.json();
    assert_eq!(log["validated"], true);

    Ok(())
}

#[tokio::test]
async fn test_generate_choroplethe_joins_dataset() -> Result<()> {
    let ctx = setup().await?;
    let (name, value) = bearer(&ctx.user_token);

    let response = ctx
        .server
        .post("/api/v1/generate")
        .add_header(name, value)
        .json(&json!({
            "prompt": "Carte de la population par département",
            "datasetCsv": "code;population\n21;534124\n25;543974\n39;259199\n"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let result: Value = response.json();
    assert_eq!(result["type"], "choroplèthe");
    assert_eq!(result["joinStats"]["totalDataRows"], 3);
    assert_eq!(result["joinStats"]["joinedFeatures"], 2);
    assert_eq!(result["joinStats"]["joinedPercentage"], 67);
    let features = result["geojson"]["features"].as_array().unwrap();
    assert_eq!(features[0]["properties"]["population"], "534124");
    assert_eq!(features[0]["properties"]["nom"], "Côte-d'Or");

    Ok(())
}

#[tokio::test]
async fn test_generate_failure_is_logged_and_reported_unavailable() -> Result<()> {
    let ctx = setup().await?;
    let (user_h, user_v) = bearer(&ctx.user_token);
    let (admin_h, admin_v) = bearer(&ctx.admin_token);

    let response = ctx
        .server
        .post("/api/v1/generate")
        .add_header(user_h, user_v)
        .json(&json!({ "prompt": "Simule une panne" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    let response = ctx
        .server
        .post("/api/v1/generate")
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&json!({ "prompt": "   " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .get("/api/v1/logs")
        .add_header(admin_h, admin_v)
        .await;
    let logs: Vec<Value> = response.json();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["success"], false);

    Ok(())
}

#[tokio::test]
async fn test_share_flow_counts_public_views_only() -> Result<()> {
    let ctx = setup().await?;
    let (name, value) = bearer(&ctx.user_token);

    let response = ctx
        .server
        .post("/api/v1/shares")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "title": "   ", "geojson": { "type": "FeatureCollection", "features": [] } }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .post("/api/v1/shares")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "title": "Mairies",
            "geojson": { "type": "FeatureCollection", "features": [] },
            "layerConfig": { "color": "#3388ff" }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let link: Value = response.json();
    let id = link["id"].as_i64().unwrap();
    let token = link["share_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);

    for expected in 1..=2 {
        let response = ctx.server.get(&format!("/map/{}", token)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let shared: Value = response.json();
        assert_eq!(shared["title"], "Mairies");
        assert_eq!(shared["viewCount"], expected);
        assert_eq!(shared["mapData"]["layerConfig"]["color"], "#3388ff");
    }

    let response = ctx
        .server
        .put(&format!("/api/v1/shares/{}/visibility", id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "isPublic": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = ctx.server.get(&format!("/map/{}", token)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = ctx
        .server
        .get("/api/v1/shares")
        .add_header(name.clone(), value.clone())
        .await;
    let links: Vec<Value> = response.json();
    assert_eq!(links[0]["view_count"], 2);

    let response = ctx
        .server
        .delete(&format!("/api/v1/shares/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = ctx.server.get(&format!("/map/{}", token)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_maps_are_private_until_published() -> Result<()> {
    let ctx = setup().await?;
    let (user_h, user_v) = bearer(&ctx.user_token);
    let (admin_h, admin_v) = bearer(&ctx.admin_token);

    let response = ctx
        .server
        .post("/api/v1/maps")
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&json!({
            "name": "Départements",
            "prompt": "Affiche les départements",
            "geojson": { "type": "FeatureCollection", "features": [] }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let map: Value = response.json();
    let id = map["id"].as_i64().unwrap();

    let response = ctx
        .server
        .get(&format!("/api/v1/maps/{}", id))
        .add_header(user_h.clone(), user_v.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = ctx
        .server
        .put(&format!("/api/v1/maps/{}/visibility", id))
        .add_header(admin_h, admin_v)
        .json(&json!({ "isPublic": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = ctx
        .server
        .get(&format!("/api/v1/maps/{}", id))
        .add_header(user_h, user_v)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_join_endpoint_and_layers() -> Result<()> {
    let ctx = setup().await?;
    let (name, value) = bearer(&ctx.user_token);

    let response = ctx
        .server
        .get("/api/v1/layers")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let layers: Vec<Value> = response.json();
    let names: Vec<&str> = layers.iter().filter_map(|l| l["name"].as_str()).collect();
    assert_eq!(names, vec!["communes", "departements"]);

    let response = ctx
        .server
        .get("/api/v1/layers/communes")
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let collection: Value = response.json();
    assert_eq!(collection["features"].as_array().unwrap().len(), 1);

    let response = ctx
        .server
        .get("/api/v1/layers/inconnu")
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = ctx
        .server
        .post("/api/v1/join")
        .json(&json!({
            "csv": "dep,taux\n\"21\",12.5\n",
            "layer": "departements",
            "dataKey": "dep"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let output: Value = response.json();
    assert_eq!(output["stats"]["joinedFeatures"], 1);
    assert_eq!(output["features"]["features"][0]["properties"]["taux"], "12.5");

    let response = ctx
        .server
        .post("/api/v1/join")
        .json(&json!({
            "csv": "dep,taux\n21,12.5\n",
            "layer": "departements",
            "dataKey": "insee"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_catalog_admin_mutations() -> Result<()> {
    let ctx = setup().await?;
    let (user_h, user_v) = bearer(&ctx.user_token);
    let (admin_h, admin_v) = bearer(&ctx.admin_token);

    let epci = json!({
        "name": "Dijon Métropole",
        "siren": "242100410",
        "geojsonUrl": "https://example.org/dijon.geojson",
        "population": 256000,
        "areaKm2": 240.0
    });

    let response = ctx
        .server
        .post("/api/v1/epci")
        .add_header(user_h.clone(), user_v.clone())
        .json(&epci)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .post("/api/v1/epci")
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&epci)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let record: Value = response.json();
    let id = record["id"].as_i64().unwrap();

    let response = ctx
        .server
        .get("/api/v1/epci")
        .add_header(user_h.clone(), user_v.clone())
        .await;
    let records: Vec<Value> = response.json();
    assert_eq!(records.len(), 1);

    let response = ctx
        .server
        .delete(&format!("/api/v1/epci/{}", id))
        .add_header(admin_h.clone(), admin_v.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = ctx
        .server
        .post("/api/v1/templates")
        .add_header(admin_h.clone(), admin_v.clone())
        .json(&json!({
            "name": "Brouillon",
            "category": "test",
            "geojson": { "type": "FeatureCollection", "features": [] },
            "isActive": false
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = ctx
        .server
        .get("/api/v1/templates")
        .add_header(user_h, user_v)
        .await;
    let templates: Vec<Value> = response.json();
    assert!(templates.is_empty());

    let response = ctx
        .server
        .get("/api/v1/templates")
        .add_header(admin_h, admin_v)
        .await;
    let templates: Vec<Value> = response.json();
    assert_eq!(templates.len(), 1);

    Ok(())
}
