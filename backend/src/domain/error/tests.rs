//! Coverage for error construction and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::invalid(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case::unauthenticated(Error::unauthenticated("who"), ErrorCode::Unauthenticated)]
#[case::unauthorized(Error::unauthorized("not yours"), ErrorCode::Unauthorized)]
#[case::disabled(Error::account_disabled("locked"), ErrorCode::AccountDisabled)]
#[case::missing(Error::not_found("gone"), ErrorCode::NotFound)]
#[case::conflict(Error::conflict("lost race"), ErrorCode::Conflict)]
#[case::upstream(Error::upstream_failure("identity said no"), ErrorCode::UpstreamFailure)]
#[case::unavailable(Error::service_unavailable("db down"), ErrorCode::ServiceUnavailable)]
#[case::internal(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn blank_messages_fall_back_to_generic_text() {
    let error = Error::internal("   ");
    assert_eq!(error.message(), FALLBACK_MESSAGE);
}

#[rstest]
fn trace_id_is_absent_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[tokio::test]
async fn trace_id_is_captured_in_scope() {
    let trace_id: TraceId = "00000000-0000-0000-0000-000000000001"
        .parse()
        .expect("valid uuid");
    let error = TraceId::scope(trace_id, async { Error::conflict("raced") }).await;
    assert_eq!(error.trace_id(), Some("00000000-0000-0000-0000-000000000001"));
}

#[rstest]
fn serialises_camel_case_and_skips_empty_fields() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise");
    assert_eq!(value, json!({"code": "not_found", "message": "missing"}));

    let detailed = Error::invalid_request("bad")
        .with_trace_id("abc")
        .with_details(json!({"field": "title"}));
    let value = serde_json::to_value(detailed).expect("serialise");
    assert_eq!(value["traceId"], "abc");
    assert_eq!(value["details"]["field"], "title");
}

#[rstest]
#[case(ErrorCode::Conflict, true)]
#[case(ErrorCode::ServiceUnavailable, true)]
#[case(ErrorCode::InternalError, true)]
#[case(ErrorCode::NotFound, false)]
#[case(ErrorCode::InvalidRequest, false)]
fn transient_codes(#[case] code: ErrorCode, #[case] expected: bool) {
    assert_eq!(code.is_transient(), expected);
}
