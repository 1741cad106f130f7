//! Integration tests per le notifiche
//!
//! Endpoints testati:
//! - GET /notifications
//! - PUT /notifications (read, read_all)
//! - GET /notifications/unread_count
//! - DELETE /notifications/{notification_id}

mod common;

#[cfg(test)]
mod notification_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    /// Bob riceve una notifica per ogni follow e una richiesta di connessione
    async fn seed_notifications_for_bob(server: &TestServer) {
        for follower in [ALICE, CHARLIE, DAVE] {
            server
                .post("/users/2/follow")
                .add_header(auth_name(), bearer(follower))
                .await
                .assert_status(StatusCode::CREATED);
        }
        request_connection(server, ALICE, BOB).await;
    }

    async fn unread_count(server: &TestServer, user: (i64, &str)) -> i64 {
        let response = server
            .get("/notifications/unread_count")
            .add_header(auth_name(), bearer(user))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["unread_count"].as_i64().unwrap()
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_list_notifications(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        let page = notifications_of(&server, BOB).await;
        let notifications = page["notifications"].as_array().unwrap();
        assert_eq!(notifications.len(), 4);
        assert_eq!(page["unread_count"], 4);

        // dalla più recente
        assert_eq!(notifications[0]["notification_type"], "CONNECTION_REQUEST");
        assert_eq!(notifications[0]["sender_id"], 1);
        assert_eq!(notifications[0]["is_read"], false);
        assert!(notifications[0]["read_at"].is_null());

        // nessuna notifica per gli altri utenti
        assert_eq!(notifications_of(&server, CHARLIE).await["unread_count"], 0);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_list_notifications_filters(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        let page: Value = server
            .get("/notifications")
            .add_query_param("category", "NETWORK")
            .add_header(auth_name(), bearer(BOB))
            .await
            .json();
        let notifications = page["notifications"].as_array().unwrap();
        assert_eq!(notifications.len(), 3);
        assert!(notifications.iter().all(|n| n["notification_type"] == "NEW_FOLLOWER"));
        // il conteggio non dipende dal filtro
        assert_eq!(page["unread_count"], 4);

        let page: Value = server
            .get("/notifications")
            .add_query_param("limit", 2)
            .add_query_param("offset", 1)
            .add_header(auth_name(), bearer(BOB))
            .await
            .json();
        assert_eq!(page["notifications"].as_array().unwrap().len(), 2);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_unread_count_by_category(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        assert_eq!(unread_count(&server, BOB).await, 4);

        for (category, expected) in [("NETWORK", 3), ("CONNECTION", 1), ("SYSTEM", 0)] {
            let response = server
                .get("/notifications/unread_count")
                .add_query_param("category", category)
                .add_header(auth_name(), bearer(BOB))
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["unread_count"], expected, "{}", category);
        }

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_mark_notification_as_read(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        let page = notifications_of(&server, BOB).await;
        let notification_id = page["notifications"][0]["notification_id"].as_i64().unwrap();

        // non è di alice
        server
            .put("/notifications")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "read", "notification_id": notification_id }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read", "notification_id": 999 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let response = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read", "notification_id": notification_id }))
            .await;
        response.assert_status_ok();
        let read: Value = response.json();
        assert_eq!(read["is_read"], true);
        let read_at = read["read_at"].clone();
        assert!(!read_at.is_null());

        // una seconda lettura non sposta read_at
        let again: Value = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read", "notification_id": notification_id }))
            .await
            .json();
        assert_eq!(again["read_at"], read_at);

        assert_eq!(unread_count(&server, BOB).await, 3);

        let unread_only: Value = server
            .get("/notifications")
            .add_query_param("unread_only", true)
            .add_header(auth_name(), bearer(BOB))
            .await
            .json();
        assert_eq!(unread_only["notifications"].as_array().unwrap().len(), 3);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_mark_all_as_read(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        let response = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read_all", "category": "CONNECTION" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["updated"], 1);
        assert_eq!(unread_count(&server, BOB).await, 3);

        let response = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read_all" }))
            .await;
        assert_eq!(response.json::<Value>()["updated"], 3);
        assert_eq!(unread_count(&server, BOB).await, 0);

        let response = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "read_all" }))
            .await;
        assert_eq!(response.json::<Value>()["updated"], 0);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_unknown_action_rejected(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .put("/notifications")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "archive" }))
            .await;
        assert!(response.status_code().is_client_error());

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_delete_notification(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        seed_notifications_for_bob(&server).await;

        let page = notifications_of(&server, BOB).await;
        let notification_id = page["notifications"][0]["notification_id"].as_i64().unwrap();
        let url = format!("/notifications/{}", notification_id);

        server
            .delete(&url)
            .add_header(auth_name(), bearer(ALICE))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&url)
            .add_header(auth_name(), bearer(BOB))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .delete(&url)
            .add_header(auth_name(), bearer(BOB))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        assert_eq!(unread_count(&server, BOB).await, 3);

        Ok(())
    }
}
