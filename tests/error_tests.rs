//! Tests for error classification, user messages and transaction buckets.

use pretty_assertions::assert_eq;
use serde_json::json;

use ledger_client::error::*;

#[test]
fn domain_error_fields_are_copied_verbatim() {
    let err = LedgerError::validation("amount must be positive")
        .with_request_id("req_9")
        .with_detail("field", json!("amount"));

    let classified = classify(err);

    assert_eq!(classified.category(), &ErrorCategory::Validation);
    assert_eq!(classified.code(), &ErrorCode::InvalidInput);
    assert_eq!(classified.message(), "amount must be positive");
    assert_eq!(classified.status_code(), Some(400));
    assert_eq!(classified.request_id(), Some("req_9"));
    assert_eq!(
        classified.details().and_then(|d| d.get("field")),
        Some(&json!("amount"))
    );
    assert!(classified.cause().is_domain());
}

#[test]
fn domain_error_messages_are_overridden_for_known_categories() {
    let cases = vec![
        (
            LedgerError::not_found("ledger", "ldg_1"),
            "The requested ledger (ldg_1) was not found",
        ),
        (
            LedgerError::from_status(401, "token expired at 12:00"),
            "Authentication failed. Please check your credentials",
        ),
        (
            LedgerError::from_status(403, "role lacks ledger:write"),
            "You do not have permission to perform this action",
        ),
        (
            LedgerError::from_status(429, "bucket empty"),
            "Rate limit exceeded. Please try again later",
        ),
    ];

    for (err, expected) in cases {
        let original = err.message().to_string();
        let classified = classify(err);
        assert_eq!(classified.message(), expected);
        assert_eq!(classified.cause().original_message(), original);
    }
}

#[test]
fn generic_error_uses_type_name_or_attached_code_as_category() {
    let plain = classify(HttpLikeError::new("Error", "boom"));
    assert_eq!(plain.category(), &ErrorCategory::Other("Error".to_string()));
    assert_eq!(plain.category().to_string(), "Error");
    assert_eq!(plain.status_code(), None);

    let coded = classify(
        HttpLikeError::new("Error", "socket closed")
            .with_status_code(502)
            .with_code("ECONNRESET"),
    );
    assert_eq!(coded.category().to_string(), "ECONNRESET");
    assert_eq!(coded.status_code(), Some(502));
    assert_eq!(coded.message(), "socket closed");
}

#[test]
fn plain_object_with_code_and_status() {
    let classified = classify(json!({
        "message": "Object error",
        "statusCode": 403,
        "code": "forbidden"
    }));

    assert_eq!(classified.category().to_string(), "forbidden");
    assert_eq!(classified.message(), "Object error");
    assert_eq!(classified.status_code(), Some(403));
}

#[test]
fn plain_object_prefers_error_field_and_defaults_to_unknown() {
    let classified = classify(json!({
        "message": "ignored",
        "error": "Bad gateway",
        "status": 502
    }));

    assert_eq!(classified.category(), &ErrorCategory::Unknown);
    assert_eq!(classified.message(), "Bad gateway");
    assert_eq!(classified.status_code(), Some(502));
}

#[test]
fn strings_and_unknown_values_never_fail_to_classify() {
    let from_str = classify("connection refused");
    assert_eq!(from_str.category(), &ErrorCategory::Unknown);
    assert_eq!(from_str.message(), "connection refused");

    for value in [json!(null), json!(42), json!([1, 2]), json!({"status": 500})] {
        let classified = classify(value);
        assert_eq!(classified.category(), &ErrorCategory::Unknown);
        assert_eq!(classified.message(), "An unknown error occurred");
    }

    let unknown = classify(RawFailure::Unknown);
    assert_eq!(unknown.message(), "An unknown error occurred");
}

#[test]
fn user_friendly_message_for_not_found_names_the_resource() {
    let classified = classify(LedgerError::not_found("account", "acc_123"));
    assert_eq!(
        user_friendly_message(&classified),
        "The requested account (acc_123) was not found"
    );
}

#[test]
fn user_friendly_message_caps_unknown_messages() {
    let short = classify("Something odd happened");
    assert_eq!(user_friendly_message(&short), "Something odd happened");

    let exactly_100 = "x".repeat(100);
    assert_eq!(user_friendly_message(&classify(exactly_100.as_str())), exactly_100);

    let verbose = format!("stack trace: {}", "frame ".repeat(40));
    assert_eq!(
        user_friendly_message(&classify(verbose)),
        "An unexpected error occurred. Please try again later"
    );
}

#[test]
fn user_friendly_message_hides_technical_detail_for_known_categories() {
    let classified = classify(LedgerError::internal("panic at ledger/src/db.rs:42"));
    assert_eq!(
        classified.user_message(),
        "An internal server error occurred. Please try again later"
    );
}

#[test]
fn transaction_errors_are_bucketed() {
    let cases = vec![
        (
            LedgerError::unprocessable(ErrorCode::InsufficientBalance, "balance too low"),
            TransactionErrorCategory::InsufficientFunds,
        ),
        (
            LedgerError::unprocessable(ErrorCode::TransactionRejected, "insufficient funds"),
            TransactionErrorCategory::InsufficientFunds,
        ),
        (
            LedgerError::unprocessable(ErrorCode::TransactionRejected, "account is inactive"),
            TransactionErrorCategory::AccountInactive,
        ),
        (
            LedgerError::unprocessable(ErrorCode::TransactionRejected, "asset code mismatch"),
            TransactionErrorCategory::AssetMismatch,
        ),
        (
            LedgerError::unprocessable(ErrorCode::TransactionRejected, "rejected by rule"),
            TransactionErrorCategory::TransactionRejected,
        ),
        (
            LedgerError::conflict(ErrorCode::IdempotencyConflict, "key already used"),
            TransactionErrorCategory::DuplicateTransaction,
        ),
        (
            LedgerError::conflict(ErrorCode::AlreadyExists, "account alias taken"),
            TransactionErrorCategory::TransactionRejected,
        ),
        (
            LedgerError::from_status(409, "request is a duplicate of tx_9"),
            TransactionErrorCategory::DuplicateTransaction,
        ),
        (
            LedgerError::validation("amount must be positive"),
            TransactionErrorCategory::InvalidTransaction,
        ),
        (
            LedgerError::not_found("account", "acc_1"),
            TransactionErrorCategory::AccountNotFound,
        ),
        (
            LedgerError::from_status(403, "nope"),
            TransactionErrorCategory::UnauthorizedTransaction,
        ),
        (
            LedgerError::from_status(429, "slow down"),
            TransactionErrorCategory::LimitExceeded,
        ),
        (
            LedgerError::internal("db down"),
            TransactionErrorCategory::TransactionFailed,
        ),
    ];

    for (err, expected) in cases {
        let description = err.to_string();
        assert_eq!(
            categorize_transaction_error(&classify(err)),
            expected,
            "{description}"
        );
    }
}

#[test]
fn transaction_error_category_renders_snake_case() {
    assert_eq!(
        TransactionErrorCategory::DuplicateTransaction.to_string(),
        "duplicate_transaction"
    );
    assert_eq!(
        "insufficient_funds".parse::<TransactionErrorCategory>().unwrap(),
        TransactionErrorCategory::InsufficientFunds
    );
}

#[test]
fn recovery_suggestions_follow_category() {
    assert_eq!(
        classify(LedgerError::from_status(503, "down")).recovery_suggestion(),
        RecoverySuggestion::ContactSupport
    );
    assert_eq!(
        classify(LedgerError::from_status(504, "slow")).recovery_suggestion(),
        RecoverySuggestion::RetryWithBackoff
    );
    assert_eq!(
        LedgerError::from_status(401, "bad key").recovery_suggestion(),
        RecoverySuggestion::CheckCredentials
    );
}

#[test]
fn ledger_error_from_status_maps_category_and_code() {
    let err = LedgerError::from_status(504, "gateway timeout");
    assert_eq!(err.category(), &ErrorCategory::Timeout);
    assert_eq!(err.code(), &ErrorCode::Timeout);
    assert_eq!(err.to_string(), "gateway timeout");
}
