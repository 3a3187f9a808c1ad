mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{inserted_id, test_app};

#[tokio::test]
async fn duplicate_request_returns_sentinel() -> Result<()> {
    let app = test_app();
    let meal = app.post_meal("Soup", "lunch", 3.0).await?;
    let body = json!({ "recEmail": "a@x.com", "recMealId": meal, "status": "pending" });

    let first = app.post("/meals-request", body.clone()).await?;
    assert_eq!(first.status, StatusCode::OK);
    assert!(inserted_id(&first).is_ok());

    let second = app.post("/meals-request", body).await?;
    assert_eq!(
        second.data(),
        &json!({ "message": "Request Already Exists", "insertedId": null })
    );

    let listed = app.get("/request-meals/a@x.com").await?;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn requests_are_joined_with_meals() -> Result<()> {
    let app = test_app();
    let meal = app.post_meal("Soup", "lunch", 3.0).await?;
    let request = inserted_id(
        &app.post(
            "/meals-request",
            json!({ "recEmail": "a@x.com", "recMealId": meal, "status": "pending" }),
        )
        .await?,
    )?;

    let response = app.get("/request-meals/a@x.com").await?;
    let record = &response.data()[0];
    assert_eq!(record["_id"], json!(request));
    assert_eq!(record["recMealId"], json!(meal));
    assert_eq!(record["title"], json!("Soup"));
    assert_eq!(record["price"], json!(3.0));
    assert_eq!(record["status"], json!("pending"));
    Ok(())
}

#[tokio::test]
async fn cancel_removes_request() -> Result<()> {
    let app = test_app();
    let meal = app.post_meal("Soup", "lunch", 3.0).await?;
    let id = inserted_id(
        &app.post("/meals-request", json!({ "recEmail": "a@x.com", "recMealId": meal }))
            .await?,
    )?;

    let response = app.delete(&format!("/cancel-req/{}", id)).await?;
    assert_eq!(response.data(), &json!({ "deletedCount": 1 }));
    assert_eq!(app.get("/request-meals/a@x.com").await?.data(), &json!([]));

    let malformed = app.delete("/cancel-req/123").await?;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn request_rejects_system_fields() -> Result<()> {
    let app = test_app();
    let response = app
        .post(
            "/meals-request",
            json!({
                "recEmail": "a@x.com",
                "recMealId": "8f14e45f-ceea-4e7a-9b3d-2f1c1e1d1a10",
                "_id": "mine"
            }),
        )
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}
