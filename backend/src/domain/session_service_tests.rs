//! Unit tests for the session authority using mocked account stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{NewAccount, SessionService, SessionTokens};
use crate::domain::auth::{AuthenticatedUser, LoginCredentials, Role};
use crate::domain::error::ErrorCode;
use crate::domain::password::hash_password;
use crate::domain::ports::{
    LockoutPolicy, LoginFailureOutcome, MockUserRepository, UserRepositoryError,
};
use crate::domain::token::{TokenClass, TokenCodec};
use crate::domain::user::{Email, UserAccount, UserId};

const PASSWORD: &str = "Traffic@123";

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 15, 10, 0, 0).single().expect("ts")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_now(),
    })
}

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(
        Zeroizing::new("unit-test-access-secret".to_owned()),
        Zeroizing::new("unit-test-refresh-secret".to_owned()),
        Duration::from_secs(900),
        Duration::from_secs(7 * 24 * 3600),
    ))
}

fn make_service(users: MockUserRepository) -> SessionService {
    SessionService::new(Arc::new(users), codec(), fixture_clock(), LockoutPolicy::default())
}

fn email() -> Email {
    Email::parse("amit@example.com").expect("valid email")
}

fn account() -> UserAccount {
    UserAccount {
        id: UserId::random(),
        email: email(),
        full_name: "Amit Kumar".to_owned(),
        phone: "9876543210".to_owned(),
        password_hash: hash_password(PASSWORD).expect("hash"),
        role: Role::Citizen,
        failed_attempts: 0,
        locked_until: None,
        is_active: true,
        refresh_token_fingerprint: None,
        last_login: None,
        created_at: fixture_now() - chrono::Duration::days(30),
    }
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials::new(email(), password.to_owned())
}

fn sha_hex(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

mod register {
    use super::*;
    use rstest::rstest;

    fn new_account(full_name: &str, phone: &str, password: &str) -> NewAccount {
        NewAccount {
            full_name: full_name.to_owned(),
            email: email(),
            phone: phone.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        }
    }

    #[rstest]
    #[case::blank_name("  ", "9876543210", PASSWORD)]
    #[case::short_password("Amit Kumar", "9876543210", "short")]
    #[case::short_phone("Amit Kumar", "98765", PASSWORD)]
    #[case::alpha_phone("Amit Kumar", "98765x3210", PASSWORD)]
    #[actix_rt::test]
    async fn rejects_invalid_input(
        #[case] full_name: &str,
        #[case] phone: &str,
        #[case] password: &str,
    ) {
        let service = make_service(MockUserRepository::new());
        let error = service
            .register(new_account(full_name, phone, password))
            .await
            .expect_err("validation should fail");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[actix_rt::test]
    async fn duplicate_email_is_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .returning(|_| Err(UserRepositoryError::DuplicateEmail));
        let service = make_service(users);
        let error = service
            .register(new_account("Amit Kumar", "9876543210", PASSWORD))
            .await
            .expect_err("insert should conflict");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[actix_rt::test]
    async fn creates_citizen_and_opens_session() {
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .withf(|record| record.role == Role::Citizen && record.failed_attempts == 0)
            .times(1)
            .returning(|_| Ok(()));
        users
            .expect_record_login_success()
            .withf(|_, _, fp| fp.len() == 64)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = make_service(users);

        let tokens = service
            .register(new_account("Amit Kumar", "9876543210", PASSWORD))
            .await
            .expect("registration should succeed");
        assert_eq!(tokens.role, Role::Citizen);
        assert!(!tokens.access.token.is_empty());
        assert_ne!(tokens.access.token, tokens.refresh.token);
    }
}

mod login {
    use super::*;

    #[actix_rt::test]
    async fn unknown_email_is_indistinguishable() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let service = make_service(users);

        let error = service
            .login(credentials(PASSWORD))
            .await
            .expect_err("unknown email should fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), "invalid email or password");
    }

    #[actix_rt::test]
    async fn wrong_password_counts_a_failure() {
        let stored = account();
        let id = stored.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_record_login_failure()
            .withf(move |failed_id, policy, _| *failed_id == id && policy.max_attempts == 5)
            .times(1)
            .returning(|_, _, _| {
                Ok(LoginFailureOutcome {
                    failed_attempts: 2,
                    locked_until: None,
                })
            });
        let service = make_service(users);

        let error = service
            .login(credentials("Wrong@123"))
            .await
            .expect_err("wrong password should fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), "invalid email or password");
    }

    #[actix_rt::test]
    async fn tripping_the_threshold_still_reports_unauthorized() {
        let stored = account();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        users.expect_record_login_failure().returning(|_, _, now| {
            Ok(LoginFailureOutcome {
                failed_attempts: 5,
                locked_until: Some(now + chrono::Duration::minutes(15)),
            })
        });
        let service = make_service(users);

        let error = service
            .login(credentials("Wrong@123"))
            .await
            .expect_err("threshold attempt should fail");
        // The lock takes effect for the next attempt.
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[actix_rt::test]
    async fn locked_account_reports_retry_after() {
        let mut stored = account();
        stored.failed_attempts = 5;
        stored.locked_until = Some(fixture_now() + chrono::Duration::minutes(10));
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = make_service(users);

        let error = service
            .login(credentials(PASSWORD))
            .await
            .expect_err("locked account should refuse even the right password");
        assert_eq!(error.code(), ErrorCode::AccountLocked);
        assert_eq!(error.retry_after_secs(), Some(600));
    }

    #[actix_rt::test]
    async fn expired_lock_admits_the_right_password() {
        let mut stored = account();
        stored.failed_attempts = 5;
        stored.locked_until = Some(fixture_now() - chrono::Duration::seconds(1));
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_record_login_success()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = make_service(users);

        let tokens = service
            .login(credentials(PASSWORD))
            .await
            .expect("expired lock should admit login");
        assert_eq!(tokens.role, Role::Citizen);
    }

    #[actix_rt::test]
    async fn deactivated_account_is_indistinguishable_from_bad_credentials() {
        let mut stored = account();
        stored.is_active = false;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = make_service(users);

        // Even with the right password, the refusal must not reveal that
        // the account exists but is deactivated.
        let error = service
            .login(credentials(PASSWORD))
            .await
            .expect_err("deactivated account should be refused");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), "invalid email or password");
    }

    #[actix_rt::test]
    async fn success_stores_the_refresh_fingerprint() {
        let stored = account();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_record_login_success()
            .withf(|_, _, fp| fp.len() == 64 && fp.bytes().all(|b| b.is_ascii_hexdigit()))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let service = make_service(users);

        let tokens = service
            .login(credentials(PASSWORD))
            .await
            .expect("login should succeed");
        assert!(tokens.refresh.expires_at > tokens.access.expires_at);
    }
}

mod refresh {
    use super::*;

    async fn opened_session(service: &SessionService) -> SessionTokens {
        service
            .login(credentials(PASSWORD))
            .await
            .expect("login should succeed")
    }

    fn users_returning(stored: UserAccount) -> MockUserRepository {
        let mut users = MockUserRepository::new();
        let for_email = stored.clone();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(for_email.clone())));
        users
            .expect_record_login_success()
            .returning(|_, _, _| Ok(()));
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users
    }

    #[actix_rt::test]
    async fn rotation_issues_a_new_pair() {
        // Issue a session, then wire the mock so the stored fingerprint
        // matches the refresh token the session handed out.
        let stored = account();
        let issue_service = make_service(users_returning(stored.clone()));
        let session = opened_session(&issue_service).await;

        let mut refreshed_account = stored;
        refreshed_account.refresh_token_fingerprint = Some(sha_hex(&session.refresh.token));
        let mut users = users_returning(refreshed_account);
        users
            .expect_store_refresh_fingerprint()
            .withf(|_, fp| fp.is_some())
            .times(1)
            .returning(|_, _| Ok(()));
        let service = make_service(users);

        let rotated = service
            .refresh(&session.refresh.token)
            .await
            .expect("refresh should rotate");
        assert_ne!(rotated.refresh.token, session.refresh.token);
    }

    #[actix_rt::test]
    async fn revoked_fingerprint_is_refused() {
        let stored = account();
        let issue_service = make_service(users_returning(stored.clone()));
        let session = opened_session(&issue_service).await;

        // Fingerprint cleared by logout, or superseded by a later login.
        let service = make_service(users_returning(stored));
        let error = service
            .refresh(&session.refresh.token)
            .await
            .expect_err("revoked token should be refused");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert!(error.message().contains("revoked"));
    }

    #[actix_rt::test]
    async fn access_token_cannot_refresh() {
        let stored = account();
        let issue_service = make_service(users_returning(stored.clone()));
        let session = opened_session(&issue_service).await;

        let service = make_service(users_returning(stored));
        let error = service
            .refresh(&session.access.token)
            .await
            .expect_err("access token must not refresh");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert!(error.message().contains("wrong purpose"));
    }

    #[actix_rt::test]
    async fn garbage_token_is_refused() {
        let service = make_service(MockUserRepository::new());
        let error = service
            .refresh("not-a-token")
            .await
            .expect_err("garbage should be refused");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }
}

mod authorize {
    use super::*;
    use rstest::rstest;

    fn issue_access(for_account: &UserAccount, claimed_role: Role) -> String {
        codec()
            .issue(for_account.id, claimed_role, TokenClass::Access, fixture_now())
            .expect("issue")
            .token
    }

    fn users_with(stored: UserAccount) -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        users
    }

    #[actix_rt::test]
    async fn missing_token_is_unauthorized() {
        let service = make_service(MockUserRepository::new());
        let error = service
            .authorize(None, &[])
            .await
            .expect_err("missing token should fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[case::any_role(&[], true)]
    #[case::matching(&[Role::Citizen], true)]
    #[case::staff_only(&[Role::Officer, Role::Admin], false)]
    #[actix_rt::test]
    async fn role_gate_follows_the_store(
        #[case] allowed: &[Role],
        #[case] admitted: bool,
    ) {
        let stored = account();
        let token = issue_access(&stored, stored.role);
        let service = make_service(users_with(stored));

        let result = service.authorize(Some(&token), allowed).await;
        match result {
            Ok(caller) => {
                assert!(admitted, "expected refusal");
                assert_eq!(caller.role, Role::Citizen);
            }
            Err(error) => {
                assert!(!admitted, "expected admission, got {error:?}");
                assert_eq!(error.code(), ErrorCode::Forbidden);
            }
        }
    }

    #[actix_rt::test]
    async fn store_role_overrides_the_token_claim() {
        // A stale token claims admin, but the store has since demoted the
        // account. The store wins.
        let stored = account();
        let token = issue_access(&stored, Role::Admin);
        let service = make_service(users_with(stored));

        let error = service
            .authorize(Some(&token), &[Role::Admin])
            .await
            .expect_err("token claim must not grant admin");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[actix_rt::test]
    async fn vanished_account_is_unauthorized() {
        let stored = account();
        let token = issue_access(&stored, stored.role);
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let service = make_service(users);

        let error = service
            .authorize(Some(&token), &[])
            .await
            .expect_err("vanished account should fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[actix_rt::test]
    async fn optional_authorize_identifies_a_valid_caller() {
        let stored = account();
        let expected = stored.id;
        let token = issue_access(&stored, stored.role);
        let service = make_service(users_with(stored));

        let caller = service
            .optional_authorize(Some(&token))
            .await
            .expect("valid token should identify the caller");
        assert_eq!(caller.id, expected);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::garbage(Some("not-a-token"))]
    #[actix_rt::test]
    async fn optional_authorize_treats_bad_tokens_as_anonymous(#[case] token: Option<&str>) {
        let service = make_service(MockUserRepository::new());
        assert!(service.optional_authorize(token).await.is_none());
    }

    #[actix_rt::test]
    async fn store_outage_is_service_unavailable() {
        let stored = account();
        let token = issue_access(&stored, stored.role);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Err(UserRepositoryError::connection("pool exhausted")));
        let service = make_service(users);

        let error = service
            .authorize(Some(&token), &[])
            .await
            .expect_err("outage should surface");
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}

mod account_management {
    use super::*;

    fn caller(stored: &UserAccount) -> AuthenticatedUser {
        AuthenticatedUser {
            id: stored.id,
            role: stored.role,
            full_name: stored.full_name.clone(),
        }
    }

    #[actix_rt::test]
    async fn logout_clears_the_fingerprint() {
        let stored = account();
        let mut users = MockUserRepository::new();
        users
            .expect_store_refresh_fingerprint()
            .withf(|_, fp| fp.is_none())
            .times(1)
            .returning(|_, _| Ok(()));
        let service = make_service(users);

        service
            .logout(&caller(&stored))
            .await
            .expect("logout should succeed");
    }

    #[actix_rt::test]
    async fn change_password_requires_the_current_one() {
        let stored = account();
        let mut users = MockUserRepository::new();
        let for_id = stored.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(for_id.clone())));
        let service = make_service(users);

        let error = service
            .change_password(&caller(&stored), "Wrong@123", "Fresh@Pass1")
            .await
            .expect_err("wrong current password should fail");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[actix_rt::test]
    async fn change_password_revokes_refresh_tokens() {
        let stored = account();
        let mut users = MockUserRepository::new();
        let for_id = stored.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(for_id.clone())));
        users
            .expect_update_password()
            .withf(|_, hash| hash.starts_with("$argon2id$"))
            .times(1)
            .returning(|_, _| Ok(()));
        users
            .expect_store_refresh_fingerprint()
            .withf(|_, fp| fp.is_none())
            .times(1)
            .returning(|_, _| Ok(()));
        let service = make_service(users);

        service
            .change_password(&caller(&stored), PASSWORD, "Fresh@Pass1")
            .await
            .expect("change should succeed");
    }
}
