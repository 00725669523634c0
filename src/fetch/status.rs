//! Mapping of HTTP status codes to fetch outcomes.

use super::types::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// 200 or 304.
    Success,
    /// Follow `Location` with the given method.
    Redirect(Method),
    NotFound,
    ServerError,
}

/// Returns `true` for the redirect codes the client follows: 301, 302, 303, 307, 308.
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Classifies the status of one exchange made with `method`.
///
/// Every redirect keeps the method. A 303 would normally switch to GET, but a
/// HEAD stays a HEAD so that a conditional check never downloads a body.
pub fn classify_status(status: u16, method: Method) -> StatusOutcome {
    match status {
        200 | 304 => StatusOutcome::Success,
        404 => StatusOutcome::NotFound,
        code if is_redirect(code) => StatusOutcome::Redirect(method),
        _ => StatusOutcome::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_redirect_all_codes() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(code), "Code {} should be a redirect", code);
        }
    }

    #[test]
    fn test_is_redirect_edge_cases() {
        assert!(!is_redirect(300)); // Multiple Choices
        assert!(!is_redirect(304)); // Not Modified
        assert!(!is_redirect(305));
        assert!(!is_redirect(306));
        assert!(!is_redirect(0));
        assert!(!is_redirect(600));
    }

    #[test]
    fn test_classification_agrees_with_is_redirect() {
        for code in 0..=999 {
            for method in [Method::Get, Method::Head] {
                let redirected =
                    matches!(classify_status(code, method), StatusOutcome::Redirect(_));
                assert_eq!(redirected, is_redirect(code), "Code {} with {}", code, method);
            }
        }
    }

    #[test]
    fn test_success_codes() {
        assert_eq!(classify_status(200, Method::Get), StatusOutcome::Success);
        assert_eq!(classify_status(304, Method::Head), StatusOutcome::Success);
        // Other 2xx codes are not part of the contract
        assert_eq!(classify_status(201, Method::Get), StatusOutcome::ServerError);
        assert_eq!(classify_status(204, Method::Get), StatusOutcome::ServerError);
    }

    #[test]
    fn test_redirects_preserve_method() {
        for code in [301, 302, 307, 308] {
            assert_eq!(
                classify_status(code, Method::Get),
                StatusOutcome::Redirect(Method::Get)
            );
            assert_eq!(
                classify_status(code, Method::Head),
                StatusOutcome::Redirect(Method::Head)
            );
        }
    }

    #[test]
    fn test_see_other_keeps_head() {
        assert_eq!(
            classify_status(303, Method::Head),
            StatusOutcome::Redirect(Method::Head)
        );
        assert_eq!(
            classify_status(303, Method::Get),
            StatusOutcome::Redirect(Method::Get)
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(classify_status(404, Method::Get), StatusOutcome::NotFound);
        for code in [300, 400, 401, 403, 410, 429, 500, 502, 503, 508] {
            assert_eq!(
                classify_status(code, Method::Get),
                StatusOutcome::ServerError,
                "Code {} should be a server error",
                code
            );
        }
    }
}
