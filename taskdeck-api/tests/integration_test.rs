/// Integration tests for the API
///
/// These drive the full router: auth flows, the refresh-token cookie,
/// task CRUD, pagination, search, and cross-user isolation. They require
/// a PostgreSQL database and skip themselves when DATABASE_URL is unset.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{authed_request, extract_refresh_cookie, read_json, unique_email, TestContext};

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_register_returns_tokens_and_cookie() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let email = unique_email();
    let response = ctx
        .request(json_request(
            "POST",
            "/auth/register",
            serde_json::json!({ "email": email, "password": "password1" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie_header = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("register should set a cookie")
        .to_string();
    assert!(cookie_header.starts_with("refreshToken="));
    assert!(cookie_header.contains("HttpOnly"));
    assert!(cookie_header.contains("SameSite=Lax"));
    assert!(cookie_header.contains("Path=/auth"));
    // Test config is not production, so the cookie must not be Secure
    assert!(!cookie_header.contains("Secure"));

    let body = read_json(response).await;
    assert_eq!(body["user"]["email"], email);
    assert!(body["user"]["id"].is_string());
    assert!(body["accessToken"].is_string());
    // The password hash must never appear on the wire
    assert!(body["user"].get("password_hash").is_none());

    let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    ctx.delete_user(id).await;
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx
        .request(json_request(
            "POST",
            "/auth/register",
            serde_json::json!({ "email": user.email, "password": "password2" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Email already in use");

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let response = ctx
        .request(json_request(
            "POST",
            "/auth/register",
            serde_json::json!({ "email": unique_email(), "password": "short" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    // Wrong password for a real account
    let wrong_password = ctx
        .request(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": user.email, "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password_body = read_json(wrong_password).await;

    // Account that does not exist at all
    let unknown_email = ctx
        .request(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": unique_email(), "password": "password1" }),
        ))
        .await;
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let unknown_email_body = read_json(unknown_email).await;

    // Identical bodies, so a caller cannot probe which emails are registered
    assert_eq!(wrong_password_body, unknown_email_body);
    assert_eq!(wrong_password_body["message"], "Invalid credentials");

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_login_returns_fresh_session() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx
        .request(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": user.email, "password": user.password }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_refresh_cookie(&response).is_some());

    let body = read_json(response).await;
    assert_eq!(body["user"]["email"], user.email);
    assert!(body["accessToken"].is_string());

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx
        .request(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::COOKIE, &user.refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    // Refresh never rotates the cookie; only the body carries a new token
    assert!(extract_refresh_cookie(&response).is_none());

    let body = read_json(response).await;
    let new_access = body["accessToken"].as_str().expect("new access token");

    // The refreshed token must work against a protected route
    let list = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/tasks")
                .header(header::AUTHORIZATION, format!("Bearer {}", new_access))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(list.status(), StatusCode::OK);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let response = ctx
        .request(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Missing refresh token");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let logout = ctx
        .request(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, &user.refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status(), StatusCode::OK);
    let body = read_json(logout).await;
    assert_eq!(body["message"], "Logged out");

    // The revoked token must no longer refresh
    let refresh = ctx
        .request(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::COOKIE, &user.refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_logout_without_cookie_still_succeeds() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let response = ctx
        .request(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Logged out");
}

#[tokio::test]
async fn test_tasks_require_authentication() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let missing = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/tasks")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/tasks")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_lifecycle() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    // Create
    let created = ctx
        .request(authed_request(
            "POST",
            "/tasks",
            &user,
            Some(serde_json::json!({ "title": "Buy milk" })),
        ))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let task = read_json(created).await;
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["status"], "TODO");
    assert!(task["description"].is_null());
    let task_id = task["id"].as_str().unwrap().to_string();

    // Toggle walks the full status cycle
    for expected in ["IN_PROGRESS", "DONE", "TODO"] {
        let toggled = ctx
            .request(authed_request(
                "POST",
                &format!("/tasks/{}/toggle", task_id),
                &user,
                None,
            ))
            .await;
        assert_eq!(toggled.status(), StatusCode::OK);
        let body = read_json(toggled).await;
        assert_eq!(body["status"], expected);
    }

    // Partial update leaves untouched fields alone
    let updated = ctx
        .request(authed_request(
            "PATCH",
            &format!("/tasks/{}", task_id),
            &user,
            Some(serde_json::json!({ "description": "2 litres, semi-skimmed" })),
        ))
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let body = read_json(updated).await;
    assert_eq!(body["title"], "Buy milk");
    assert_eq!(body["description"], "2 litres, semi-skimmed");

    // Delete, then the task is gone
    let deleted = ctx
        .request(authed_request(
            "DELETE",
            &format!("/tasks/{}", task_id),
            &user,
            None,
        ))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = ctx
        .request(authed_request(
            "GET",
            &format!("/tasks/{}", task_id),
            &user,
            None,
        ))
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_create_task_rejects_empty_title() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx
        .request(authed_request(
            "POST",
            "/tasks",
            &user,
            Some(serde_json::json!({ "title": "" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_cross_user_access_is_not_found() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let owner = ctx.register_user().await;
    let intruder = ctx.register_user().await;

    let created = ctx
        .request(authed_request(
            "POST",
            "/tasks",
            &owner,
            Some(serde_json::json!({ "title": "Private task" })),
        ))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let task = read_json(created).await;
    let task_id = task["id"].as_str().unwrap().to_string();

    // Another user's task reads as absent, never as forbidden
    for (method, body) in [
        ("GET", None),
        ("PATCH", Some(serde_json::json!({ "title": "Hijacked" }))),
        ("DELETE", None),
    ] {
        let response = ctx
            .request(authed_request(
                method,
                &format!("/tasks/{}", task_id),
                &intruder,
                body,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} leaked");
    }

    let toggle = ctx
        .request(authed_request(
            "POST",
            &format!("/tasks/{}/toggle", task_id),
            &intruder,
            None,
        ))
        .await;
    assert_eq!(toggle.status(), StatusCode::NOT_FOUND);

    // The owner still sees the task untouched
    let still_there = ctx
        .request(authed_request(
            "GET",
            &format!("/tasks/{}", task_id),
            &owner,
            None,
        ))
        .await;
    assert_eq!(still_there.status(), StatusCode::OK);
    let body = read_json(still_there).await;
    assert_eq!(body["title"], "Private task");

    ctx.delete_user(owner.id).await;
    ctx.delete_user(intruder.id).await;
}

#[tokio::test]
async fn test_pagination_rounds_total_pages_up() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    for i in 0..12 {
        let response = ctx
            .request(authed_request(
                "POST",
                "/tasks",
                &user,
                Some(serde_json::json!({ "title": format!("Task {}", i) })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let first = ctx
        .request(authed_request("GET", "/tasks?page=1&pageSize=5", &user, None))
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = read_json(first).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["total"], 12);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 5);
    assert_eq!(body["totalPages"], 3);

    let last = ctx
        .request(authed_request("GET", "/tasks?page=3&pageSize=5", &user, None))
        .await;
    let body = read_json(last).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["totalPages"], 3);

    // Pages past the end are empty, not an error
    let beyond = ctx
        .request(authed_request("GET", "/tasks?page=9&pageSize=5", &user, None))
        .await;
    let body = read_json(beyond).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 12);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    for title in ["first", "second", "third"] {
        let response = ctx
            .request(authed_request(
                "POST",
                "/tasks",
                &user,
                Some(serde_json::json!({ "title": title })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx.request(authed_request("GET", "/tasks", &user, None)).await;
    let body = read_json(response).await;
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_empty_list_has_zero_pages() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx.request(authed_request("GET", "/tasks", &user, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["totalPages"], 0);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    for title in ["Write Report", "Send report to Alice", "Water the plants"] {
        let response = ctx
            .request(authed_request(
                "POST",
                "/tasks",
                &user,
                Some(serde_json::json!({ "title": title })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .request(authed_request("GET", "/tasks?search=report", &user, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Write Report"));
    assert!(titles.contains(&"Send report to Alice"));

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_search_matches_wildcard_characters_literally() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    for title in ["Discount 50%", "Discount 505", "Rename a_c", "Rename abc"] {
        let response = ctx
            .request(authed_request(
                "POST",
                "/tasks",
                &user,
                Some(serde_json::json!({ "title": title })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // "%" in the term is a literal percent sign, not a wildcard
    let response = ctx
        .request(authed_request("GET", "/tasks?search=50%25", &user, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Discount 50%");

    // "_" must not match an arbitrary single character
    let response = ctx
        .request(authed_request("GET", "/tasks?search=a_c", &user, None))
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Rename a_c");

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_list_with_non_numeric_page_params_uses_defaults() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    let response = ctx
        .request(authed_request(
            "GET",
            "/tasks?page=abc&pageSize=xyz",
            &user,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 10);

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let user = ctx.register_user().await;

    for (title, status) in [("One", "TODO"), ("Two", "DONE"), ("Three", "DONE")] {
        let response = ctx
            .request(authed_request(
                "POST",
                "/tasks",
                &user,
                Some(serde_json::json!({ "title": title, "status": status })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .request(authed_request("GET", "/tasks?status=DONE", &user, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    for item in body["items"].as_array().unwrap() {
        assert_eq!(item["status"], "DONE");
    }

    ctx.delete_user(user.id).await;
}

#[tokio::test]
async fn test_health_check() {
    let Some(ctx) = TestContext::new().await.unwrap() else {
        return;
    };

    let response = ctx
        .request(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["version"].is_string());
}
