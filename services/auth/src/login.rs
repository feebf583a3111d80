//! Login outcome rules

use common::{
    accounts::{Account, AccountRole, AccountStatus},
    response::ApiError,
};

pub const ACCOUNT_NOT_FOUND: &str = "No account found with this email address.";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Decide a customer/provider login from the account owning the email
///
/// `expected` is the role the client asked for; `None` accepts whichever
/// role owns the email. The password check runs only once the role matches.
pub fn decide_login<F>(
    expected: Option<AccountRole>,
    account: Option<&Account>,
    password_matches: F,
) -> Result<AccountRole, ApiError>
where
    F: FnOnce(&Account) -> bool,
{
    let Some(account) = account else {
        return Err(ApiError::NotFound(ACCOUNT_NOT_FOUND.to_string()));
    };

    let Some(role) = account.role() else {
        return Err(ApiError::NotFound(ACCOUNT_NOT_FOUND.to_string()));
    };

    if let Some(expected) = expected {
        if expected != role {
            return Err(ApiError::BadRequest(format!(
                "This email is registered as a {0} account. Please switch to {0} login.",
                role.label()
            )));
        }
    }

    if !password_matches(account) {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let status = account.status().unwrap_or(AccountStatus::Inactive);
    if status.blocks_login() {
        return Err(ApiError::Forbidden(format!(
            "Your account has been {}. Please contact support.",
            status.as_str()
        )));
    }

    Ok(role)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    pub(crate) fn account(role: &str, status: &str) -> Account {
        let now = Utc::now();
        Account {
            id: 11,
            role: role.to_string(),
            email: "someone@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Nadia".to_string(),
            last_name: "Benali".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: "Algeria".to_string(),
            profile_picture: "/assets/images/default-avatar.jpg".to_string(),
            date_of_birth: None,
            gender: None,
            preferred_language: "en".to_string(),
            timezone: None,
            account_status: status.to_string(),
            email_verified: false,
            verification_token: None,
            reset_token: None,
            reset_token_expires: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_email_is_404() {
        let err = decide_login(Some(AccountRole::User), None, |_| true).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), ACCOUNT_NOT_FOUND);
    }

    #[test]
    fn other_role_gets_switch_guidance() {
        let customer = account("user", "active");
        let err = decide_login(Some(AccountRole::Provider), Some(&customer), |_| true).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "This email is registered as a Customer account. Please switch to Customer login."
        );

        let provider = account("provider", "active");
        let err = decide_login(Some(AccountRole::User), Some(&provider), |_| true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "This email is registered as a Provider account. Please switch to Provider login."
        );
    }

    #[test]
    fn role_mismatch_does_not_check_password() {
        let customer = account("user", "active");
        let result = decide_login(Some(AccountRole::Provider), Some(&customer), |_| {
            panic!("password must not be checked")
        });
        assert!(result.is_err());
    }

    #[test]
    fn wrong_password_is_401() {
        let customer = account("user", "active");
        let err = decide_login(Some(AccountRole::User), Some(&customer), |_| false).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);
    }

    #[test]
    fn blocked_statuses_are_403() {
        for status in ["inactive", "suspended", "deactivated", "deleted"] {
            let provider = account("provider", status);
            let err = decide_login(None, Some(&provider), |_| true).unwrap_err();
            assert_eq!(err.status(), StatusCode::FORBIDDEN);
            assert_eq!(
                err.to_string(),
                format!("Your account has been {}. Please contact support.", status)
            );
        }
    }

    #[test]
    fn untyped_login_accepts_owning_role() {
        let provider = account("provider", "active");
        assert_eq!(
            decide_login(None, Some(&provider), |_| true).expect("login"),
            AccountRole::Provider
        );
    }
}
