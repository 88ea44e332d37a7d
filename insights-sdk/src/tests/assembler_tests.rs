//! Tests for result assembly and error body parsing

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::assembler::{assemble, ErrorBody};
    use crate::error::{ErrorKind, ServiceError};
    use crate::tests::support::*;

    #[test]
    fn test_client_error_lifts_error_fields() {
        let record = assemble(
            &entry("bad-1", 400),
            valuation_request(json!([])),
            invalid_instruments_response(),
        )
        .unwrap();

        assert!(record.is_client_error());
        assert_eq!(record.error(), Some("InvalidParameterValue"));

        let details = record.error_details().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].parameter_id, "instruments");
        assert_eq!(details[0].message, "must not be empty");

        // Bodies are kept verbatim
        assert_eq!(record.response, invalid_instruments_response());
        assert_eq!(record.request["instruments"], json!([]));
    }

    #[test]
    fn test_success_has_no_error_fields() {
        let record = assemble(&entry("ok-1", 200), valuation_request(json!([])), valuation_response()).unwrap();

        assert_eq!(record.id, "ok-1");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.error(), None);
        assert_eq!(record.error_details(), None);

        let serialized = serde_json::to_value(&record).unwrap();
        assert!(serialized.get("error").is_none());
        assert!(serialized.get("errorDetails").is_none());
    }

    #[test]
    fn test_server_error_is_not_a_client_failure() {
        // 5xx bodies are not required to follow the error schema
        let record = assemble(&entry("down-1", 503), json!({}), json!("Service Unavailable")).unwrap();
        assert!(!record.is_client_error());
    }

    #[test]
    fn test_serialized_client_error_carries_flattened_fields() {
        let record = assemble(&entry("bad-1", 400), json!({}), invalid_instruments_response()).unwrap();
        let serialized = serde_json::to_value(&record).unwrap();

        assert_eq!(serialized["statusCode"], json!(400));
        assert_eq!(serialized["error"], json!("InvalidParameterValue"));
        assert_eq!(serialized["errorDetails"][0]["parameterId"], json!("instruments"));
    }

    #[test]
    fn test_client_error_without_details_is_malformed() {
        let err = assemble(
            &entry("bad-2", 422),
            json!({}),
            json!({"name": "InvalidRequest", "title": "Bad"}),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedErrorBody);
        assert_eq!(err.status_code(), Some(422));
    }

    #[test]
    fn test_client_error_with_text_body_is_malformed() {
        let err = assemble(&entry("bad-3", 400), json!({}), json!("Bad Request")).unwrap_err();

        assert!(matches!(err.root(), ServiceError::MalformedErrorBody(msg) if msg.contains("string")));
    }

    #[test]
    fn test_error_detail_aliases() {
        let body = ErrorBody::parse(&json!({
            "name": "InvalidParameterValue",
            "errorDetails": [
                {"id": "effectiveAt", "detail": "must be a valid date"},
                {"parameterId": "recipeId", "message": "is required"}
            ]
        }))
        .unwrap();

        assert_eq!(body.error_details.len(), 2);
        assert_eq!(body.error_details[0].parameter_id, "effectiveAt");
        assert_eq!(body.error_details[0].message, "must be a valid date");
        assert_eq!(body.error_details[1].parameter_id, "recipeId");
    }

    #[test]
    fn test_empty_details_list_is_accepted() {
        let body = ErrorBody::parse(&json!({"name": "InvalidRequest", "errorDetails": []})).unwrap();
        assert!(body.error_details.is_empty());
    }
}
