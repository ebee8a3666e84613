//! `${VAR}` expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// An unset variable without a default is an error naming `field`.
/// Bare `$VAR` is left alone, so URLs containing `$` survive untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that was referenced but not set.
struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_site_url_host() {
        // SAFETY: each test uses a variable name no other test touches
        unsafe {
            std::env::set_var("KILN_TEST_SITE_HOST", "mysite.test");
        }
        let result = expand_env("https://${KILN_TEST_SITE_HOST}/", "site.url").unwrap();
        assert_eq!(result, "https://mysite.test/");
        unsafe {
            std::env::remove_var("KILN_TEST_SITE_HOST");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: each test uses a variable name no other test touches
        unsafe {
            std::env::remove_var("KILN_TEST_UNSET_URL");
        }
        let result = expand_env("${KILN_TEST_UNSET_URL:-http://localhost/}", "site.url").unwrap();
        assert_eq!(result, "http://localhost/");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: each test uses a variable name no other test touches
        unsafe {
            std::env::remove_var("KILN_TEST_MISSING");
        }
        let err = expand_env("${KILN_TEST_MISSING}", "site.url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("KILN_TEST_MISSING"));
        assert!(err.to_string().contains("site.url"));
    }

    #[test]
    fn test_literal_and_bare_dollar_unchanged() {
        assert_eq!(expand_env("public", "build.output_dir").unwrap(), "public");
        assert_eq!(
            expand_env("https://example.com/$path", "site.url").unwrap(),
            "https://example.com/$path"
        );
    }
}
