//! Integration tests per la macchina a stati delle connessioni
//!
//! Endpoints testati:
//! - GET/POST/PUT/DELETE /connections
//! - POST/DELETE /connections/block

mod common;

#[cfg(test)]
mod connection_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use devcollab::ws::usermap::InternalSignal;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;
    use std::future::IntoFuture;
    use tokio::sync::mpsc::unbounded_channel;

    async fn respond(
        server: &axum_test::TestServer,
        user: (i64, &str),
        connection_id: i64,
        decision: &str,
    ) -> axum_test::TestResponse {
        server
            .put("/connections")
            .add_header(auth_name(), bearer(user))
            .json(&json!({ "action": "respond", "connection_id": connection_id, "decision": decision }))
            .await
    }

    async fn withdraw(
        server: &axum_test::TestServer,
        user: (i64, &str),
        connection_id: i64,
    ) -> axum_test::TestResponse {
        server
            .delete("/connections")
            .add_header(auth_name(), bearer(user))
            .json(&json!({ "action": "withdraw", "connection_id": connection_id }))
            .await
    }

    async fn block(
        server: &axum_test::TestServer,
        user: (i64, &str),
        target_id: i64,
    ) -> axum_test::TestResponse {
        server
            .post("/connections/block")
            .add_header(auth_name(), bearer(user))
            .json(&json!({ "target_id": target_id }))
            .await
    }

    // ============================================================
    // Richiesta e risposta
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_and_accept(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({
                "action": "request",
                "receiver_id": 2,
                "connection_type": "COLLABORATOR",
                "message": "Let's build something"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let connection: Value = response.json();
        assert_eq!(connection["status"], "PENDING");
        assert_eq!(connection["connection_type"], "COLLABORATOR");
        let connection_id = connection["connection_id"].as_i64().unwrap();

        // bob riceve la richiesta come notifica ad alta priorità
        let page = notifications_of(&server, BOB).await;
        assert_eq!(page["notifications"][0]["notification_type"], "CONNECTION_REQUEST");
        assert_eq!(page["notifications"][0]["priority"], "HIGH");

        let response = respond(&server, BOB, connection_id, "ACCEPTED").await;
        response.assert_status_ok();
        let connection: Value = response.json();
        assert_eq!(connection["status"], "ACCEPTED");

        let page = notifications_of(&server, ALICE).await;
        assert_eq!(page["notifications"][0]["notification_type"], "CONNECTION_ACCEPTED");

        // entrambi vedono la connessione
        for user in [ALICE, BOB] {
            let connections: Vec<Value> = server
                .get("/connections")
                .add_query_param("status", "ACCEPTED")
                .add_header(auth_name(), bearer(user))
                .await
                .json();
            assert_eq!(connections.len(), 1);
            assert_eq!(connections[0]["connection_id"], connection_id);
        }

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_defaults_to_professional(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 3 }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let connection: Value = response.json();
        assert_eq!(connection["connection_type"], "PROFESSIONAL");

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_only_receiver_can_respond(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = request_connection(&server, ALICE, BOB).await;

        respond(&server, ALICE, connection_id, "ACCEPTED")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        respond(&server, CHARLIE, connection_id, "ACCEPTED")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        respond(&server, BOB, 999, "ACCEPTED")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_respond_twice_conflicts(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = request_connection(&server, ALICE, BOB).await;

        respond(&server, BOB, connection_id, "ACCEPTED")
            .await
            .assert_status_ok();
        respond(&server, BOB, connection_id, "DECLINED")
            .await
            .assert_status(StatusCode::CONFLICT);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_responses_have_one_winner(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = request_connection(&server, ALICE, BOB).await;

        let accept = server
            .put("/connections")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "respond", "connection_id": connection_id, "decision": "ACCEPTED" }))
            .into_future();
        let decline = server
            .put("/connections")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "respond", "connection_id": connection_id, "decision": "DECLINED" }))
            .into_future();

        let (first, second) = futures::future::join(accept, decline).await;
        let mut statuses = vec![first.status_code().as_u16(), second.status_code().as_u16()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK.as_u16(), StatusCode::CONFLICT.as_u16()]);

        // alice riceve una sola notifica di risposta
        let page = notifications_of(&server, ALICE).await;
        assert_eq!(page["notifications"].as_array().unwrap().len(), 1);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_crossed_requests_have_one_winner(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let forward = server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": BOB.0 }))
            .into_future();
        let reverse = server
            .post("/connections")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "request", "receiver_id": ALICE.0 }))
            .into_future();

        let (first, second) = futures::future::join(forward, reverse).await;
        let mut statuses = vec![first.status_code().as_u16(), second.status_code().as_u16()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED.as_u16(), StatusCode::CONFLICT.as_u16()]);

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM connections WHERE status = 'PENDING'")
                .fetch_one(&pool)
                .await?;
        assert_eq!(pending, 1);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_duplicate_and_reverse_requests_conflict(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        request_connection(&server, ALICE, BOB).await;

        for (from, to) in [(ALICE, BOB), (BOB, ALICE)] {
            server
                .post("/connections")
                .add_header(auth_name(), bearer(from))
                .json(&json!({ "action": "request", "receiver_id": to.0 }))
                .await
                .assert_status(StatusCode::CONFLICT);
        }

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_to_connected_user_conflicts(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        connect(&server, ALICE, BOB).await;

        server
            .post("/connections")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "action": "request", "receiver_id": 1 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_declined_request_can_be_sent_again(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = request_connection(&server, ALICE, BOB).await;

        let response = respond(&server, BOB, connection_id, "DECLINED").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "DECLINED");

        // la riga DECLINED viene riutilizzata
        let again = request_connection(&server, ALICE, BOB).await;
        assert_eq!(again, connection_id);

        let connections: Vec<Value> = server
            .get("/connections")
            .add_header(auth_name(), bearer(BOB))
            .await
            .json();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0]["status"], "PENDING");

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_validation(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 1 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 999 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 2, "message": "x".repeat(501) }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        Ok(())
    }

    // ============================================================
    // Privacy
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_denied_by_privacy_nobody(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .patch("/users/me/privacy")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "connection_privacy": "NOBODY" }))
            .await
            .assert_status_ok();

        server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 2 }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_connections_of_connections(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        // alice - bob - dave
        connect(&server, ALICE, BOB).await;
        connect(&server, BOB, DAVE).await;

        server
            .patch("/users/me/privacy")
            .add_header(auth_name(), bearer(DAVE))
            .json(&json!({ "connection_privacy": "CONNECTIONS_OF_CONNECTIONS" }))
            .await
            .assert_status_ok();

        // charlie non ha connessioni in comune con dave
        server
            .post("/connections")
            .add_header(auth_name(), bearer(CHARLIE))
            .json(&json!({ "action": "request", "receiver_id": 4 }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // alice condivide bob con dave
        server
            .post("/connections")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "action": "request", "receiver_id": 4 }))
            .await
            .assert_status(StatusCode::CREATED);

        Ok(())
    }

    // ============================================================
    // Withdraw
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_withdraw_pending_request(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = request_connection(&server, ALICE, BOB).await;

        withdraw(&server, BOB, connection_id)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        withdraw(&server, ALICE, connection_id)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        withdraw(&server, ALICE, connection_id)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // dopo il ritiro si può inviare una nuova richiesta in entrambe le direzioni
        request_connection(&server, BOB, ALICE).await;

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_withdraw_accepted_conflicts(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = connect(&server, ALICE, BOB).await;

        withdraw(&server, ALICE, connection_id)
            .await
            .assert_status(StatusCode::CONFLICT);

        Ok(())
    }

    // ============================================================
    // Block
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_is_idempotent_and_notifies_once(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = block(&server, ALICE, 2).await;
        response.assert_status_ok();
        let blocked: Value = response.json();
        assert_eq!(blocked["status"], "BLOCKED");
        assert_eq!(blocked["sender_id"], 1);
        assert_eq!(blocked["receiver_id"], 2);

        let again = block(&server, ALICE, 2).await;
        again.assert_status_ok();
        assert_eq!(again.json::<Value>()["connection_id"], blocked["connection_id"]);

        let page = notifications_of(&server, BOB).await;
        let blocked_notifications = page["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["notification_type"] == "CONNECTION_BLOCKED")
            .count();
        assert_eq!(blocked_notifications, 1);

        // il bloccato non vede la riga BLOCKED tra le sue connessioni
        let connections: Vec<Value> = server
            .get("/connections")
            .add_header(auth_name(), bearer(BOB))
            .await
            .json();
        assert!(connections.is_empty());

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_concurrent_blocks_notify_once(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let first = server
            .post("/connections/block")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "target_id": BOB.0 }))
            .into_future();
        let second = server
            .post("/connections/block")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "target_id": BOB.0 }))
            .into_future();

        let (first, second) = futures::future::join(first, second).await;
        first.assert_status_ok();
        second.assert_status_ok();
        assert_eq!(
            first.json::<Value>()["connection_id"],
            second.json::<Value>()["connection_id"]
        );

        let notified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE recipient_id = ? AND notification_type = 'CONNECTION_BLOCKED'",
        )
        .bind(BOB.0)
        .fetch_one(&pool)
        .await?;
        assert_eq!(notified, 1);

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_overrides_accepted_connection(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let connection_id = connect(&server, ALICE, BOB).await;

        let blocked: Value = block(&server, ALICE, 2).await.json();
        assert_eq!(blocked["connection_id"], connection_id);
        assert_eq!(blocked["status"], "BLOCKED");

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_prevents_contact(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .post("/users/2/follow")
            .add_header(auth_name(), bearer(ALICE))
            .await
            .assert_status(StatusCode::CREATED);

        block(&server, BOB, 1).await.assert_status_ok();

        // il follow esistente viene rimosso
        let following: Vec<Value> = server
            .get("/users/1/following")
            .add_header(auth_name(), bearer(ALICE))
            .await
            .json();
        assert!(following.is_empty());

        // nessuna delle due direzioni può contattare l'altra
        for (from, to) in [(ALICE, BOB), (BOB, ALICE)] {
            server
                .post("/connections")
                .add_header(auth_name(), bearer(from))
                .json(&json!({ "action": "request", "receiver_id": to.0 }))
                .await
                .assert_status(StatusCode::FORBIDDEN);
            server
                .post(&format!("/users/{}/follow", to.0))
                .add_header(auth_name(), bearer(from))
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_unblock(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .delete("/connections/block")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "target_id": 2 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        block(&server, ALICE, 2).await.assert_status_ok();

        // solo chi ha bloccato può sbloccare
        server
            .delete("/connections/block")
            .add_header(auth_name(), bearer(BOB))
            .json(&json!({ "target_id": 1 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .delete("/connections/block")
            .add_header(auth_name(), bearer(ALICE))
            .json(&json!({ "target_id": 2 }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        request_connection(&server, BOB, ALICE).await;

        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_block_self_and_unknown(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        block(&server, ALICE, 1)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        block(&server, ALICE, 999)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        Ok(())
    }

    // ============================================================
    // Eventi in tempo reale
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_request_is_relayed_to_receiver(pool: SqlitePool) -> sqlx::Result<()> {
        let state = create_test_state(pool);
        let server = create_test_server(state.clone());

        let (tx, mut rx) = unbounded_channel();
        state.relay.users.register_online(BOB.0, tx);

        request_connection(&server, ALICE, BOB).await;

        let mut events = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            if let InternalSignal::Event(envelope) = signal {
                assert_eq!(envelope.channel, "user:2");
                events.push(envelope.event.name());
            }
        }
        assert!(events.contains(&"notification:new"));
        assert!(events.contains(&"connection:requested"));

        Ok(())
    }
}
