use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            DashboardStats, OrderCounts, ProductCounts, UpdateOrderStatusRequest,
            UpdateUserRequest, UpdateUserStatusRequest, UserCounts, UserList,
        },
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
            ResetPasswordRequest,
        },
        cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        favorites::{AddFavoriteRequest, FavoriteEntry, FavoriteProductList},
        notifications::{MarkedRead, NotificationList, UnreadCount},
        orders::{
            BuyerContact, CheckoutResponse, LowStockWarning, OrderList, OrderWithItems,
            PickupResult, SellerOrder, SellerOrderList, SellerOrderSummary, WebhookAck,
        },
        products::{
            AdminUpdateProductRequest, ContentEntry, CreateProductRequest, ProductList,
            RegionList, UpdateProductRequest,
        },
    },
    entity::enums::{AccountStatus, NotificationKind, OrderStatus, UserRole},
    models::{Category, Favorite, Notification, Order, OrderItem, Product, ProductContent, User},
    response::{Ack, Meta},
    routes::{
        admin, auth, cart, favorites, health, notifications, orders, params, products, shop,
        upload,
    },
    storage::StoredFile,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "GreenCart API", description = "Local producers and restaurants marketplace"),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        products::list_products,
        products::list_my_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        shop::shop_products,
        shop::featured_products,
        shop::get_shop_product,
        shop::products_by_category,
        shop::categories,
        shop::regions,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::checkout,
        orders::list_orders,
        orders::list_seller_orders,
        orders::get_order,
        orders::mark_ready,
        orders::confirm_pickup,
        orders::webhook,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        admin::dashboard,
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::set_user_status,
        admin::delete_user,
        admin::list_products,
        admin::update_product,
        admin::delete_product,
        admin::list_categories,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::delete_order,
        admin::list_low_stock,
        upload::upload_product_image,
        upload::upload_student_proof,
        upload::get_product_image,
        upload::get_student_proof,
        upload::delete_product_image,
        upload::delete_student_proof
    ),
    components(
        schemas(
            User,
            Product,
            ProductContent,
            Category,
            Favorite,
            Order,
            OrderItem,
            Notification,
            UserRole,
            AccountStatus,
            OrderStatus,
            NotificationKind,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            MessageResponse,
            ContentEntry,
            CreateProductRequest,
            UpdateProductRequest,
            AdminUpdateProductRequest,
            ProductList,
            RegionList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartItemDto,
            CheckoutResponse,
            SellerOrderSummary,
            LowStockWarning,
            OrderWithItems,
            OrderList,
            BuyerContact,
            SellerOrder,
            SellerOrderList,
            PickupResult,
            WebhookAck,
            AddFavoriteRequest,
            FavoriteEntry,
            FavoriteProductList,
            NotificationList,
            UnreadCount,
            MarkedRead,
            DashboardStats,
            UserCounts,
            ProductCounts,
            OrderCounts,
            UpdateUserRequest,
            UpdateUserStatusRequest,
            UserList,
            UpdateOrderStatusRequest,
            StoredFile,
            upload::UploadForm,
            health::HealthData,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            Meta,
            Ack
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Products", description = "Seller product management"),
        (name = "Shop", description = "Public catalog"),
        (name = "Cart", description = "Consumer cart"),
        (name = "Orders", description = "Checkout, seller orders and pickup"),
        (name = "Favorites", description = "Favorite products"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Admin", description = "Moderation and back office"),
        (name = "Upload", description = "Product images and student proofs"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
