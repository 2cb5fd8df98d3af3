//! HTTP transport against the fake backend: auth header, query string and
//! error mapping.

use actix_web::http::Method;
use anyhow::Result;
use client::{ListApi, MutationMethod, Session};
use pretty_assertions::assert_eq;
use serde_json::json;
use shared::error::ClientError;
use shared::filter::{DateRange, FilterState};
use shared::models::auth::Role;
use shared::query::{build_query, SortOrder};
use shared::resource::ListResource;
use shared::Tickets;
use testing::{fixtures, signed_in, FakeBackend, FakeResponse, TEST_TOKEN};

#[test_log::test(actix_rt::test)]
async fn test_list_request_carries_bearer_and_canonical_query() -> Result<()> {
    let backend = FakeBackend::start().await?;
    backend.push(Method::GET, Tickets::PATH, FakeResponse::json(fixtures::tickets_unpaginated()));
    let api = backend.http_api()?;

    let filters = FilterState::new()
        .with_choice("status", "pending")
        .with_text("customer", "Ava Stone")
        .with_date_range(DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            None,
        ));
    let query = build_query(&filters, Some(SortOrder::DateDesc), 2, 25);
    let body = api.get_list(&signed_in(Role::Admin), Tickets::PATH, &query).await?;
    assert!(body.contains("\"tickets\""));

    let requests = backend.requests_to(Method::GET, Tickets::PATH);
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.authorization, Some(format!("Bearer {}", TEST_TOKEN)));
    assert_eq!(request.param("status").as_deref(), Some("pending"));
    assert_eq!(request.param("customer").as_deref(), Some("Ava Stone"));
    assert_eq!(request.param("startDate").as_deref(), Some("2024-03-01"));
    assert_eq!(request.param("endDate"), None);
    assert_eq!(request.param("sort").as_deref(), Some("dateDesc"));
    assert_eq!(request.param("page").as_deref(), Some("2"));
    assert_eq!(request.param("limit").as_deref(), Some("25"));
    Ok(())
}

#[test_log::test(actix_rt::test)]
async fn test_html_error_page_becomes_displayable_http_error() -> Result<()> {
    let backend = FakeBackend::start().await?;
    backend.push(
        Method::GET,
        Tickets::PATH,
        FakeResponse::text(502, "<html><body>Bad gateway</body></html>"),
    );
    let api = backend.http_api()?;

    let query = build_query(&FilterState::new(), None, 1, 25);
    let error = api
        .get_list(&signed_in(Role::Admin), Tickets::PATH, &query)
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(502));
    assert!(!error.user_message().is_empty());
    assert!(error.to_string().contains("Bad gateway"));
    Ok(())
}

#[test_log::test(actix_rt::test)]
async fn test_json_error_message_is_surfaced() -> Result<()> {
    let backend = FakeBackend::start().await?;
    backend.push(
        Method::DELETE,
        "/api/admin/tickets/t1",
        FakeResponse::json_status(409, json!({"error": {"message": "Ticket already refunded"}})),
    );
    let api = backend.http_api()?;

    let error = api
        .mutate(&signed_in(Role::Admin), MutationMethod::Delete, "/api/admin/tickets/t1", None)
        .await
        .unwrap_err();
    assert_eq!(error.user_message(), "Ticket already refunded");
    Ok(())
}

#[test_log::test(actix_rt::test)]
async fn test_rejected_token_maps_to_auth() -> Result<()> {
    let backend = FakeBackend::start().await?;
    backend.always(Method::GET, Tickets::PATH, FakeResponse::json(fixtures::tickets_unpaginated()));
    let api = backend.http_api()?;

    let query = build_query(&FilterState::new(), None, 1, 25);
    let error = api
        .get_list(&Session::signed_in("expired", Role::Admin), Tickets::PATH, &query)
        .await
        .unwrap_err();
    assert!(matches!(error, ClientError::Auth(_)));

    // The backend was reached, but with the stale token.
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer expired"));
    Ok(())
}

#[test_log::test(actix_rt::test)]
async fn test_mutation_bodies_and_empty_responses() -> Result<()> {
    let backend = FakeBackend::start().await?;
    backend.push(Method::DELETE, "/api/admin/tickets/t1", FakeResponse::no_content());
    backend.push(
        Method::POST,
        "/api/admin/refunds/rf1/approve",
        FakeResponse::json(json!({"message": "Refund approved"})),
    );
    let api = backend.http_api()?;
    let session = signed_in(Role::Admin);

    let deleted = api
        .mutate(&session, MutationMethod::Delete, "/api/admin/tickets/t1", None)
        .await?;
    assert!(deleted.success);

    let approved = api
        .mutate(
            &session,
            MutationMethod::Post,
            "/api/admin/refunds/rf1/approve",
            Some(json!({"notifyCustomer": true})),
        )
        .await?;
    assert!(approved.success);
    assert_eq!(approved.message.as_deref(), Some("Refund approved"));

    let posted = backend.requests_to(Method::POST, "/api/admin/refunds/rf1/approve");
    assert_eq!(posted[0].body, Some(json!({"notifyCustomer": true})));
    Ok(())
}

#[test_log::test(actix_rt::test)]
async fn test_export_returns_raw_csv() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let path = Tickets::export_path();
    backend.push(Method::GET, &path, FakeResponse::csv("id,customer\nt1,Ava Stone\n"));
    let api = backend.http_api()?;

    let query = build_query(&FilterState::new().with_choice("status", "pending"), None, 1, 25)
        .without_pagination();
    let bytes = api.export(&signed_in(Role::Staff), &path, &query).await?;
    assert_eq!(String::from_utf8(bytes)?, "id,customer\nt1,Ava Stone\n");

    let request = &backend.requests_to(Method::GET, &path)[0];
    assert_eq!(request.param("status").as_deref(), Some("pending"));
    assert_eq!(request.param("page"), None);
    Ok(())
}
