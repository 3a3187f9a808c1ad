mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{inserted_id, test_app, titles, TestApp};

async fn seed(app: &TestApp) -> Result<()> {
    app.post_meal("Pancakes", "breakfast", 4.0).await?;
    app.post_meal("Tomato Soup", "lunch", 6.5).await?;
    app.post_meal("Chicken soup", "dinner", 12.0).await?;
    app.post_meal("Soup of the day", "lunch", 5.0).await?;
    app.post_meal("Salad", "lunch", 9.0).await?;
    Ok(())
}

#[tokio::test]
async fn post_meal_validates() -> Result<()> {
    let app = test_app();

    let negative = app
        .post("/post-meal", json!({ "title": "Free", "mealType": "lunch", "price": -1 }))
        .await?;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
    assert!(negative.body["field_errors"]["price"].is_string());

    let likes = app
        .post("/post-meal", json!({ "title": "Rigged", "mealType": "lunch", "price": 1, "likes": 99 }))
        .await?;
    assert_eq!(likes.status, StatusCode::BAD_REQUEST);

    let response = app
        .post("/post-meal", json!({ "title": "Stew", "mealType": "dinner", "price": 8, "chef": "Bo" }))
        .await?;
    let id = inserted_id(&response)?;

    let details = app.get(&format!("/details/{}", id)).await?;
    assert_eq!(details.status, StatusCode::OK);
    assert_eq!(details.data()["_id"], json!(id));
    assert_eq!(details.data()["likes"], json!(0));
    assert_eq!(details.data()["chef"], json!("Bo"));
    assert_eq!(details.data()["mealType"], json!("dinner"));
    Ok(())
}

#[tokio::test]
async fn details_errors() -> Result<()> {
    let app = test_app();
    let missing = app.get("/details/8f14e45f-ceea-4e7a-9b3d-2f1c1e1d1a10").await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = app.get("/details/not-an-id").await?;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn empty_catalogue_is_an_empty_list() -> Result<()> {
    let app = test_app();
    let response = app.get("/meals").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data(), &json!([]));
    assert_eq!(app.get("/meals-len").await?.data(), &json!({ "count": 0 }));
    Ok(())
}

#[tokio::test]
async fn type_filter_combines_with_search() -> Result<()> {
    let app = test_app();
    seed(&app).await?;

    let response = app.get("/meals?filter=lunch&search=soup").await?;
    assert_eq!(titles(response.data()), vec!["Soup of the day", "Tomato Soup"]);

    let response = app.get("/meals?search=SOUP").await?;
    assert_eq!(titles(response.data()).len(), 3);
    Ok(())
}

#[tokio::test]
async fn price_bucket_is_inclusive() -> Result<()> {
    let app = test_app();
    seed(&app).await?;

    let response = app.get("/meals?filter=5,10").await?;
    assert_eq!(titles(response.data()), vec!["Salad", "Soup of the day", "Tomato Soup"]);
    Ok(())
}

#[tokio::test]
async fn unknown_filter_is_ignored() -> Result<()> {
    let app = test_app();
    seed(&app).await?;

    let response = app.get("/meals?filter=snacks").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(titles(response.data()).len(), 5);
    Ok(())
}

#[tokio::test]
async fn pagination_uses_page_index() -> Result<()> {
    let app = test_app();
    seed(&app).await?;

    let response = app.get("/meals?limit=2&offset=1").await?;
    assert_eq!(titles(response.data()), vec!["Chicken soup", "Tomato Soup"]);

    let response = app.get("/meals?limit=abc&offset=xyz").await?;
    assert_eq!(titles(response.data()).len(), 5);
    Ok(())
}

#[tokio::test]
async fn home_page_strips() -> Result<()> {
    let app = test_app();
    for n in 0..8 {
        app.post_meal(&format!("Meal {}", n), "dinner", 3.0).await?;
    }
    app.post_meal("Porridge", "breakfast", 2.0).await?;

    assert_eq!(app.get("/meals-len").await?.data(), &json!({ "count": 9 }));

    let six = app.get("/meals-six").await?;
    assert_eq!(
        titles(six.data()),
        vec!["Porridge", "Meal 7", "Meal 6", "Meal 5", "Meal 4", "Meal 3"]
    );

    let breakfast = app.get("/breakfast").await?;
    assert_eq!(titles(breakfast.data()), vec!["Porridge"]);

    let dinner = app.get("/dinner").await?;
    assert_eq!(titles(dinner.data()).len(), 6);

    let lunch = app.get("/lunch").await?;
    assert_eq!(lunch.data(), &json!([]));
    Ok(())
}

#[tokio::test]
async fn likes_adjust_counter_and_flag() -> Result<()> {
    let app = test_app();
    let id = app.post_meal("Soup", "lunch", 3.0).await?;

    let liked_uri = format!("/liked-count?id={}&email=a@x.com", id);
    assert_eq!(app.get(&liked_uri).await?.data(), &json!(false));

    let response = app
        .put("/like-count", json!({ "id": id, "count": 1, "liked": 1, "email": "a@x.com" }))
        .await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.data(),
        &json!({ "matchedCount": 1, "modifiedCount": 1, "upserted": true })
    );
    assert_eq!(app.get(&liked_uri).await?.data(), &json!(true));
    assert_eq!(app.get(&format!("/details/{}", id)).await?.data()["likes"], json!(1));

    let response = app
        .put("/like-count", json!({ "id": id, "count": -1, "liked": false, "email": "a@x.com" }))
        .await?;
    assert_eq!(response.data()["upserted"], json!(false));
    assert_eq!(app.get(&liked_uri).await?.data(), &json!(false));
    assert_eq!(app.get(&format!("/details/{}", id)).await?.data()["likes"], json!(0));
    Ok(())
}

#[tokio::test]
async fn like_count_is_bounded() -> Result<()> {
    let app = test_app();
    let id = app.post_meal("Soup", "lunch", 3.0).await?;

    let response = app
        .put("/like-count", json!({ "id": id, "count": 100, "liked": true, "email": "a@x.com" }))
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/liked-count?id=nope&email=a@x.com").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}
