use axum::http::StatusCode;
use greencart_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        admin::UpdateUserStatusRequest,
        auth::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest},
        cart::{AddToCartRequest, MAX_CART_QUANTITY, UpdateCartItemRequest},
        favorites::AddFavoriteRequest,
        products::{
            AdminUpdateProductRequest, ContentEntry, CreateProductRequest, UpdateProductRequest,
        },
    },
    entity::{
        Carts, Users,
        carts::Column as CartCol,
        enums::{AccountStatus, NotificationKind, OrderStatus, UserRole},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    routes::params::{NotificationQuery, OrderListQuery, ProductQuery},
    services::{
        admin_service, auth_service, cart_service, favorite_service, notification_service,
        order_service, product_service, shop_service, upload_service,
    },
    state::AppState,
    storage::{FileStore, UploadKind},
    token::{digest_reset_token, generate_reset_token},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

async fn test_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run marketplace flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let state = AppState::new(pool, AppConfig::for_database(database_url, "flow-test-secret"))?;
    run_migrations(&state.orm).await?;
    Ok(Some(state))
}

fn register_request(email: &str, role: Option<UserRole>) -> RegisterRequest {
    let seller = role.is_some_and(|r| r.is_seller());
    RegisterRequest {
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        phone: Some("0600000000".to_string()),
        address: None,
        city: None,
        postal_code: None,
        region: Some("Occitanie".to_string()),
        company_name: seller.then(|| "Ferme Test".to_string()),
        siret: seller.then(|| "12345678901234".to_string()),
        iban: seller.then(|| "FR7630006000011234567890189".to_string()),
        bic: seller.then(|| "AGRIFRPP".to_string()),
    }
}

async fn register(state: &AppState, role: Option<UserRole>) -> anyhow::Result<AuthUser> {
    let email = format!("{}@flow.test", Uuid::new_v4());
    let resp = auth_service::register_user(state, register_request(&email, role)).await?;
    let user = resp.data.expect("registered user");
    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

async fn create_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let admin = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("admin-{}@flow.test", Uuid::new_v4())),
        password_hash: Set(auth_service::hash_password("admin1234")?),
        first_name: Set("Admin".to_string()),
        last_name: Set("Flow".to_string()),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        postal_code: Set(None),
        region: Set(None),
        company_name: Set(None),
        role: Set(UserRole::Admin),
        account_status: Set(AccountStatus::Approved),
        siret: Set(None),
        iban: Set(None),
        bic: Set(None),
        student_proof: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser {
        user_id: admin.id,
        role: UserRole::Admin,
    })
}

async fn approved_seller(
    state: &AppState,
    admin: &AuthUser,
    role: UserRole,
) -> anyhow::Result<AuthUser> {
    let seller = register(state, Some(role)).await?;
    admin_service::set_user_status(
        state,
        admin,
        seller.user_id,
        UpdateUserStatusRequest {
            status: AccountStatus::Approved,
        },
    )
    .await?;
    Ok(seller)
}

async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let resp = product_service::create_product(
        state,
        seller,
        CreateProductRequest {
            name: name.to_string(),
            description: Some("Invendus du jour".to_string()),
            price,
            original_price: Some(price * 2),
            stock,
            category_id: None,
            image_url: None,
            product_type: Some("Panier".to_string()),
            region: Some("Occitanie".to_string()),
            pickup_info: Some("17h-19h".to_string()),
            solidaire: false,
            contents: vec![ContentEntry {
                emoji: "🥕".to_string(),
                label: "Carottes".to_string(),
            }],
        },
    )
    .await?;
    Ok(resp.data.expect("product").id)
}

async fn add_to_cart(
    state: &AppState,
    buyer: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), greencart_api::error::AppError> {
    cart_service::add_item(
        state,
        buyer,
        AddToCartRequest {
            product_id,
            quantity,
        },
    )
    .await
    .map(|_| ())
}

async fn notification_kinds(
    state: &AppState,
    user: &AuthUser,
) -> anyhow::Result<Vec<NotificationKind>> {
    let resp =
        notification_service::list_notifications(state, user, NotificationQuery::default()).await?;
    Ok(resp
        .data
        .expect("notifications")
        .items
        .into_iter()
        .map(|n| n.kind)
        .collect())
}

#[tokio::test]
async fn pending_seller_cannot_sign_in_until_approved() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("{}@flow.test", Uuid::new_v4());
    let registered = auth_service::register_user(
        &state,
        register_request(&email, Some(UserRole::Producer)),
    )
    .await?
    .data
    .expect("registered user");
    assert_eq!(registered.account_status, AccountStatus::Pending);

    let login = || LoginRequest {
        email: email.clone(),
        password: "password123".to_string(),
    };
    let err = auth_service::login_user(&state, login()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert!(err.to_string().contains("pending approval"));

    let admin = create_admin(&state).await?;
    admin_service::set_user_status(
        &state,
        &admin,
        registered.id,
        UpdateUserStatusRequest {
            status: AccountStatus::Approved,
        },
    )
    .await?;
    assert!(notification_kinds(
        &state,
        &AuthUser {
            user_id: registered.id,
            role: UserRole::Producer,
        }
    )
    .await?
    .contains(&NotificationKind::AccountApproved));

    let resp = auth_service::login_user(&state, login()).await?;
    let session = resp.data.expect("login");
    assert_eq!(session.token_type, "Bearer");
    assert_eq!(session.user.account_status, AccountStatus::Approved);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_and_admin_registration_are_refused() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("{}@flow.test", Uuid::new_v4());
    auth_service::register_user(&state, register_request(&email, None)).await?;
    let err = auth_service::register_user(&state, register_request(&email, None))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let other = format!("{}@flow.test", Uuid::new_v4());
    let err = auth_service::register_user(&state, register_request(&other, Some(UserRole::Admin)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn checkout_splits_orders_and_runs_pickup_flow() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let producer = approved_seller(&state, &admin, UserRole::Producer).await?;
    let restaurant = approved_seller(&state, &admin, UserRole::Restaurant).await?;
    let buyer = register(&state, None).await?;
    let stranger = register(&state, None).await?;

    let product_a = create_product(&state, &producer, "Panier A", 1000, 10).await?;
    let product_b = create_product(&state, &restaurant, "Plat B", 500, 6).await?;

    // Quantity accumulates and is capped by stock.
    add_to_cart(&state, &buyer, product_a, 1).await?;
    add_to_cart(&state, &buyer, product_a, 1).await?;
    add_to_cart(&state, &buyer, product_b, 1).await?;
    let err = add_to_cart(&state, &buyer, product_b, 10).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let cart = cart_service::get_cart(&state, &buyer)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.item_count, 3);
    assert_eq!(cart.total, 2500);

    let checkout = order_service::checkout(&state, &buyer)
        .await?
        .data
        .expect("checkout");
    assert_eq!(checkout.total, 2500);
    assert_eq!(checkout.orders.len(), 2);
    assert!(checkout.client_secret.starts_with("pi_sim_"));

    let order_x = checkout
        .orders
        .iter()
        .find(|o| o.seller_id == producer.user_id)
        .expect("producer order");
    let order_y = checkout
        .orders
        .iter()
        .find(|o| o.seller_id == restaurant.user_id)
        .expect("restaurant order");
    assert_eq!(order_x.total, 2000);
    assert_eq!(order_y.total, 500);

    // 6 - 1 leaves the restaurant product at the low-stock threshold.
    assert_eq!(checkout.low_stock_warnings.len(), 1);
    assert_eq!(checkout.low_stock_warnings[0].product_id, product_b);
    assert_eq!(checkout.low_stock_warnings[0].remaining, 5);

    let product = product_service::get_product(&state, product_a)
        .await?
        .data
        .expect("product");
    assert_eq!(product.stock, 8);

    let cart = cart_service::get_cart(&state, &buyer)
        .await?
        .data
        .expect("cart");
    assert!(cart.items.is_empty());

    let err = order_service::checkout(&state, &buyer).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let orders = order_service::list_orders(&state, &buyer, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert_eq!(orders.items.len(), 2);
    assert!(orders.items.iter().all(|o| o.status == OrderStatus::Paid));

    assert!(notification_kinds(&state, &producer).await?.contains(&NotificationKind::NewOrder));
    let restaurant_kinds = notification_kinds(&state, &restaurant).await?;
    assert!(restaurant_kinds.contains(&NotificationKind::NewOrder));
    assert!(restaurant_kinds.contains(&NotificationKind::LowStock));

    // Seller view shows only its own items plus buyer contact.
    let seller_orders = order_service::list_seller_orders(&state, &producer, OrderListQuery::default())
        .await?
        .data
        .expect("seller orders");
    let seen = seller_orders
        .items
        .iter()
        .find(|o| o.order.id == order_x.order_id)
        .expect("order visible to seller");
    assert!(seen.items.iter().all(|i| i.seller_id == Some(producer.user_id)));
    assert_eq!(seen.buyer.as_ref().map(|b| b.id), Some(buyer.user_id));

    // Nothing is ready yet.
    let pickup = order_service::confirm_order_pickup(&state, &buyer, order_x.order_id)
        .await?
        .data
        .expect("pickup");
    assert_eq!(pickup.picked_up, 0);

    let err = order_service::notify_order_ready(&state, &restaurant, order_x.order_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    order_service::notify_order_ready(&state, &producer, order_x.order_id).await?;
    let err = order_service::notify_order_ready(&state, &producer, order_x.order_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(notification_kinds(&state, &buyer).await?.contains(&NotificationKind::OrderReady));

    let err = order_service::confirm_order_pickup(&state, &stranger, order_x.order_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let pickup = order_service::confirm_order_pickup(&state, &buyer, order_x.order_id)
        .await?
        .data
        .expect("pickup");
    assert_eq!(pickup.picked_up, 1);
    assert!(pickup.order.items.iter().all(|i| i.picked_up));
    assert!(
        notification_kinds(&state, &producer)
            .await?
            .contains(&NotificationKind::OrderPickedUp)
    );

    let err = order_service::get_order(&state, &stranger, order_y.order_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn favorites_are_idempotent_and_seller_only_edits_own_products() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let producer = approved_seller(&state, &admin, UserRole::Producer).await?;
    let other_producer = approved_seller(&state, &admin, UserRole::Producer).await?;
    let consumer = register(&state, None).await?;

    let product_id = create_product(&state, &producer, "Pain", 250, 3).await?;

    for _ in 0..2 {
        favorite_service::add_favorite(&state, &consumer, AddFavoriteRequest { product_id })
            .await?;
    }
    let favorites = favorite_service::list_favorites(&state, &consumer, Default::default())
        .await?
        .data
        .expect("favorites");
    assert_eq!(favorites.items.len(), 1);

    favorite_service::remove_favorite(&state, &consumer, product_id).await?;
    let err = favorite_service::remove_favorite(&state, &consumer, product_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = product_service::delete_product(&state, &other_producer, product_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let err = favorite_service::add_favorite(
        &state,
        &producer,
        AddFavoriteRequest { product_id },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    product_service::delete_product(&state, &producer, product_id).await?;
    let err = product_service::get_product(&state, product_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn reset_token_works_once_and_not_after_expiry() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("{}@flow.test", Uuid::new_v4());
    let user = auth_service::register_user(&state, register_request(&email, None))
        .await?
        .data
        .expect("user");

    let reply = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: email.clone(),
        },
    )
    .await?;
    let unknown = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: format!("{}@flow.test", Uuid::new_v4()),
        },
    )
    .await?;
    assert_eq!(reply.message, unknown.message);

    let stored = Users::find_by_id(user.id)
        .one(&state.orm)
        .await?
        .expect("user row");
    let digest = stored.reset_token.clone().expect("digest stored");
    assert_eq!(digest.len(), 64);
    assert!(stored.reset_token_expires_at.is_some());

    // The mailed token is not observable here, so plant a known one.
    let token = generate_reset_token();
    let mut active: UserActive = stored.into();
    active.reset_token = Set(Some(digest_reset_token(&token)));
    active.reset_token_expires_at =
        Set(Some((chrono::Utc::now() + chrono::Duration::minutes(5)).fixed_offset()));
    let stored = active.update(&state.orm).await?;

    let reset = || ResetPasswordRequest {
        token: token.clone(),
        password: "new-password-1".to_string(),
    };
    auth_service::reset_password(&state, reset()).await?;
    let err = auth_service::reset_password(&state, reset()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    auth_service::validate_user(&state, &email, "new-password-1").await?;

    let mut active: UserActive = stored.into();
    active.reset_token = Set(Some(digest_reset_token(&token)));
    active.reset_token_expires_at =
        Set(Some((chrono::Utc::now() - chrono::Duration::minutes(1)).fixed_offset()));
    active.update(&state.orm).await?;
    let err = auth_service::reset_password(&state, reset()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

/// Seller whose company name carries a unique tag, so shop searches only
/// see this test's products.
async fn tagged_seller(state: &AppState, admin: &AuthUser) -> anyhow::Result<(AuthUser, String)> {
    let tag = Uuid::new_v4().simple().to_string()[..10].to_string();
    let mut request = register_request(&format!("{tag}@flow.test"), Some(UserRole::Producer));
    request.company_name = Some(format!("Ferme {tag}"));
    let user = auth_service::register_user(state, request)
        .await?
        .data
        .expect("registered seller");
    admin_service::set_user_status(
        state,
        admin,
        user.id,
        UpdateUserStatusRequest {
            status: AccountStatus::Approved,
        },
    )
    .await?;
    let seller = AuthUser {
        user_id: user.id,
        role: UserRole::Producer,
    };
    Ok((seller, tag))
}

async fn shop_names(state: &AppState, query: ProductQuery) -> anyhow::Result<Vec<String>> {
    let list = shop_service::shop_products(state, query)
        .await?
        .data
        .expect("shop products");
    Ok(list.items.into_iter().map(|p| p.name).collect())
}

async fn cart_quantity(state: &AppState, buyer: &AuthUser, product_id: Uuid) -> anyhow::Result<i32> {
    let cart = cart_service::get_cart(state, buyer).await?.data.expect("cart");
    Ok(cart
        .items
        .iter()
        .find(|i| i.product.id == product_id)
        .map_or(0, |i| i.quantity))
}

async fn unread(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    Ok(notification_service::unread_count(state, user)
        .await?
        .data
        .expect("count")
        .unread)
}

#[tokio::test]
async fn rejected_seller_cannot_sign_in() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("{}@flow.test", Uuid::new_v4());
    let registered = auth_service::register_user(
        &state,
        register_request(&email, Some(UserRole::Restaurant)),
    )
    .await?
    .data
    .expect("registered user");

    let admin = create_admin(&state).await?;
    admin_service::set_user_status(
        &state,
        &admin,
        registered.id,
        UpdateUserStatusRequest {
            status: AccountStatus::Rejected,
        },
    )
    .await?;

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "password123".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert!(err.to_string().contains("rejected"));
    Ok(())
}

#[tokio::test]
async fn cart_quantity_is_bounded_and_never_wraps() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let producer = approved_seller(&state, &admin, UserRole::Producer).await?;
    let buyer = register(&state, None).await?;
    let product_id = create_product(&state, &producer, "Panier", 400, 10).await?;

    add_to_cart(&state, &buyer, product_id, 1).await?;
    let err = add_to_cart(&state, &buyer, product_id, i32::MAX)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(cart_quantity(&state, &buyer, product_id).await?, 1);

    for quantity in [0, -1, MAX_CART_QUANTITY + 1] {
        let err = cart_service::update_item(
            &state,
            &buyer,
            product_id,
            UpdateCartItemRequest { quantity },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "quantity {quantity}");
    }
    assert_eq!(cart_quantity(&state, &buyer, product_id).await?, 1);

    let cart = cart_service::get_cart(&state, &buyer).await?.data.expect("cart");
    assert_eq!(cart.total, 400);
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicates_resolve_cleanly() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let email = format!("{}@flow.test", Uuid::new_v4());
    let (first, second) = tokio::join!(
        auth_service::register_user(&state, register_request(&email, None)),
        auth_service::register_user(&state, register_request(&email, None)),
    );
    let outcomes = [first.map(|_| ()), second.map(|_| ())];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let err = outcomes
        .into_iter()
        .find_map(Result::err)
        .expect("one registration refused");
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let admin = create_admin(&state).await?;
    let producer = approved_seller(&state, &admin, UserRole::Producer).await?;
    let buyer = register(&state, None).await?;
    let product_id = create_product(&state, &producer, "Soupe", 300, 10).await?;

    let (a, b) = tokio::join!(
        add_to_cart(&state, &buyer, product_id, 1),
        add_to_cart(&state, &buyer, product_id, 1),
    );
    a?;
    b?;
    let quantity = cart_quantity(&state, &buyer, product_id).await?;
    assert!((1..=2).contains(&quantity));
    Ok(())
}

#[tokio::test]
async fn shop_lists_only_available_products_featured_first() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let (seller, tag) = tagged_seller(&state, &admin).await?;

    let star = create_product(&state, &seller, "Star", 900, 4).await?;
    create_product(&state, &seller, "Plain", 300, 4).await?;
    create_product(&state, &seller, "Empty", 300, 0).await?;
    let hidden = create_product(&state, &seller, "Hidden", 300, 4).await?;

    product_service::update_product(
        &state,
        &seller,
        hidden,
        UpdateProductRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;
    admin_service::update_product_admin(
        &state,
        &admin,
        star,
        AdminUpdateProductRequest {
            product: UpdateProductRequest::default(),
            featured: Some(true),
            rating: None,
        },
    )
    .await?;

    // The producer name matches regardless of case.
    let names = shop_names(
        &state,
        ProductQuery {
            q: Some(tag.to_uppercase()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(names, ["Star", "Plain"]);

    // Wildcards in the search term are literal.
    let names = shop_names(
        &state,
        ProductQuery {
            producer: Some(tag.clone()),
            q: Some("%".to_string()),
            ..Default::default()
        },
    )
    .await?;
    assert!(names.is_empty());

    let err = shop_service::get_shop_product(&state, hidden)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn selling_the_last_unit_takes_product_off_the_shop() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let (seller, tag) = tagged_seller(&state, &admin).await?;
    let buyer = register(&state, None).await?;
    let product_id = create_product(&state, &seller, "Dernier panier", 700, 1).await?;

    let by_producer = || ProductQuery {
        producer: Some(tag.clone()),
        ..Default::default()
    };
    assert_eq!(shop_names(&state, by_producer()).await?, ["Dernier panier"]);

    add_to_cart(&state, &buyer, product_id, 1).await?;
    order_service::checkout(&state, &buyer).await?;

    let product = product_service::get_product(&state, product_id)
        .await?
        .data
        .expect("product");
    assert_eq!(product.stock, 0);
    assert!(!product.is_active);
    assert!(shop_names(&state, by_producer()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_users_keeps_sold_orders_and_drops_bought_ones() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let admin = create_admin(&state).await?;
    let seller = approved_seller(&state, &admin, UserRole::Producer).await?;
    let other_seller = approved_seller(&state, &admin, UserRole::Restaurant).await?;
    let buyer = register(&state, None).await?;

    let sold = create_product(&state, &seller, "Légumes", 500, 5).await?;
    let kept = create_product(&state, &other_seller, "Plat", 800, 5).await?;

    add_to_cart(&state, &buyer, sold, 2).await?;
    let checkout = order_service::checkout(&state, &buyer)
        .await?
        .data
        .expect("checkout");
    let order_id = checkout.orders[0].order_id;
    add_to_cart(&state, &buyer, kept, 1).await?;

    admin_service::delete_user(&state, &admin, seller.user_id).await?;
    let order = admin_service::get_order_admin(&state, &admin, order_id)
        .await?
        .data
        .expect("order kept");
    assert_eq!(order.order.seller_id, None);
    assert_eq!(order.order.total_amount, 1000);
    assert!(order.items.iter().all(|i| i.seller_id.is_none() && i.product_id.is_none()));
    assert_eq!(order.items[0].product_name, "Légumes");

    admin_service::delete_user(&state, &admin, buyer.user_id).await?;
    let err = admin_service::get_order_admin(&state, &admin, order_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(buyer.user_id))
        .one(&state.orm)
        .await?;
    assert!(cart.is_none());
    assert!(Users::find_by_id(buyer.user_id).one(&state.orm).await?.is_none());

    let err = admin_service::delete_user(&state, &admin, admin.user_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn notifications_are_marked_read_by_their_owner_only() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let owner = register(&state, None).await?;
    let other = register(&state, None).await?;
    for message in ["Commande prête", "Commande récupérée"] {
        notification_service::notify(&state.orm, owner.user_id, NotificationKind::OrderReady, message)
            .await?;
    }

    assert_eq!(unread(&state, &owner).await?, 2);

    let first = notification_service::list_notifications(&state, &owner, NotificationQuery::default())
        .await?
        .data
        .expect("notifications")
        .items[0]
        .id;

    let err = notification_service::mark_read(&state, &other, first)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(unread(&state, &owner).await?, 2);

    let marked = notification_service::mark_read(&state, &owner, first)
        .await?
        .data
        .expect("notification");
    assert!(marked.read);
    assert_eq!(unread(&state, &owner).await?, 1);

    let all = notification_service::mark_all_read(&state, &owner)
        .await?
        .data
        .expect("marked");
    assert_eq!(all.updated, 1);
    assert_eq!(unread(&state, &owner).await?, 0);
    Ok(())
}

#[tokio::test]
async fn product_images_are_deleted_by_their_uploader_only() -> anyhow::Result<()> {
    let Some(mut state) = test_state().await? else {
        return Ok(());
    };
    let root = std::env::temp_dir().join(format!("greencart-flow-{}", Uuid::new_v4()));
    state.files = FileStore::new(&root, 1024);

    let admin = create_admin(&state).await?;
    let uploader = approved_seller(&state, &admin, UserRole::Producer).await?;
    let rival = approved_seller(&state, &admin, UserRole::Restaurant).await?;

    let stored = upload_service::upload(
        &state,
        &uploader,
        UploadKind::ProductImage,
        "panier.png",
        b"\x89PNG fake",
    )
    .await?
    .data
    .expect("stored");

    let err = upload_service::delete_file(&state, &rival, UploadKind::ProductImage, &stored.filename)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert!(state.files.exists(UploadKind::ProductImage, &stored.filename).await?);

    upload_service::delete_file(&state, &uploader, UploadKind::ProductImage, &stored.filename)
        .await?;
    assert!(!state.files.exists(UploadKind::ProductImage, &stored.filename).await?);

    // Files with no recorded uploader are left to admins.
    let orphan = state
        .files
        .save(UploadKind::ProductImage, "orphan.jpg", b"jpeg")
        .await?;
    let err = upload_service::delete_file(&state, &uploader, UploadKind::ProductImage, &orphan.filename)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    upload_service::delete_file(&state, &admin, UploadKind::ProductImage, &orphan.filename).await?;
    assert!(!state.files.exists(UploadKind::ProductImage, &orphan.filename).await?);

    let _ = tokio::fs::remove_dir_all(&root).await;
    Ok(())
}
