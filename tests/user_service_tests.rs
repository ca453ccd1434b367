use bazaar::{
    repositories::user_repository::SqliteUserRepository,
    services::user_service::{
        CreateUserRequest, UpdatePasswordRequest, UserService, UserServiceError,
    },
    services::password::verify_password,
    test_utils::test_helpers,
};
use std::sync::Arc;

fn customer(username: &str, email: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
        password_confirm: None,
        is_active: true,
        is_staff: false,
        is_superuser: false,
    }
}

async fn service() -> (UserService, sqlx::SqlitePool) {
    let pool = test_helpers::create_test_db().await.unwrap();
    let repository = Arc::new(SqliteUserRepository::new(pool.clone()));
    (UserService::new(repository), pool)
}

#[tokio::test]
async fn test_create_superuser() {
    let (service, _pool) = service().await;

    let user = service
        .create_user(CreateUserRequest::superuser(
            "root".to_string(),
            "root@Shop.Test".to_string(),
            "password123".to_string(),
        ))
        .await
        .unwrap();

    assert!(user.is_active);
    assert!(user.is_staff);
    assert!(user.is_superuser);
    assert_eq!(user.email, "root@shop.test");
    assert!(verify_password("password123", &user.password_hash));
}

#[tokio::test]
async fn test_create_user_rejects_duplicates() {
    let (service, _pool) = service().await;
    service.create_user(customer("alice", "a@x.com")).await.unwrap();

    let result = service.create_user(customer("alice", "other@x.com")).await;
    assert!(matches!(result, Err(UserServiceError::AlreadyRegistered)));

    let result = service.create_user(customer("alice2", "A@X.COM")).await;
    assert!(matches!(result, Err(UserServiceError::AlreadyRegistered)));
}

#[tokio::test]
async fn test_create_user_validates_input() {
    let (service, _pool) = service().await;

    assert!(matches!(
        service.create_user(customer("alice", "not-an-email")).await,
        Err(UserServiceError::InvalidEmail(_))
    ));
    assert!(matches!(
        service.create_user(customer("has space", "a@x.com")).await,
        Err(UserServiceError::InvalidUsername(_))
    ));

    let mut mismatched = customer("alice", "a@x.com");
    mismatched.password_confirm = Some("different".to_string());
    assert!(matches!(
        service.create_user(mismatched).await,
        Err(UserServiceError::PasswordMismatch)
    ));
}

#[tokio::test]
async fn test_set_active_and_update_password() {
    let (service, _pool) = service().await;
    let mut request = customer("bob", "b@x.com");
    request.is_active = false;
    let user = service.create_user(request).await.unwrap();

    service.set_active(user.id, true).await.unwrap();
    let stored = service.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.is_active);

    service
        .update_password(UpdatePasswordRequest {
            user_id: user.id,
            new_password: "new-secret".to_string(),
            new_password_confirm: Some("new-secret".to_string()),
        })
        .await
        .unwrap();
    let stored = service.find_user_by_email("b@x.com").await.unwrap().unwrap();
    assert!(verify_password("new-secret", &stored.password_hash));

    assert!(matches!(
        service.set_active(9999, true).await,
        Err(UserServiceError::UserNotFound)
    ));
}

#[tokio::test]
async fn test_delete_user_cascades_owned_rows() {
    let (service, pool) = service().await;
    let user = service.create_user(customer("carol", "c@x.com")).await.unwrap();

    sqlx::query("INSERT INTO carts (user_id) VALUES (?)")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    service.delete_user(user.id).await.unwrap();

    let carts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(carts, 0);
    assert!(matches!(
        service.delete_user(user.id).await,
        Err(UserServiceError::UserNotFound)
    ));
}

#[tokio::test]
async fn test_list_users_newest_first() {
    let (service, _pool) = service().await;
    let first = service.create_user(customer("first", "1@x.com")).await.unwrap();
    let second = service.create_user(customer("second", "2@x.com")).await.unwrap();

    let users = service.list_users(Some(10), None).await.unwrap();
    let ids: Vec<i64> = users.iter().map(|user| user.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let page = service.list_users(Some(1), Some(1)).await.unwrap();
    assert_eq!(page[0].id, first.id);
}
