use greencart_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    entity::enums::{AccountStatus, UserRole},
    services::{auth_service::hash_password, category_service::slugify},
};
use sea_orm::ActiveEnum;
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    original_price: i64,
    stock: i32,
    product_type: &'static str,
    category: &'static str,
    featured: bool,
    contents: &'static [(&'static str, &'static str)],
}

const CATEGORIES: &[&str] = &["Fruits & Légumes", "Boulangerie", "Plats préparés", "Crèmerie"];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Panier de légumes de saison",
        description: "Légumes invendus du marché, récoltés cette semaine",
        price: 600,
        original_price: 1500,
        stock: 12,
        product_type: "Panier",
        category: "Fruits & Légumes",
        featured: true,
        contents: &[("🥕", "Carottes"), ("🥬", "Salade"), ("🍅", "Tomates")],
    },
    SeedProduct {
        name: "Pain de la veille",
        description: "Baguettes et pains de campagne de la veille",
        price: 250,
        original_price: 700,
        stock: 20,
        product_type: "Boulangerie",
        category: "Boulangerie",
        featured: false,
        contents: &[("🥖", "Baguettes"), ("🍞", "Pain de campagne")],
    },
    SeedProduct {
        name: "Plateau fromager",
        description: "Fromages affinés proches de leur date limite",
        price: 800,
        original_price: 1800,
        stock: 4,
        product_type: "Crèmerie",
        category: "Crèmerie",
        featured: true,
        contents: &[("🧀", "Comté"), ("🧀", "Tomme")],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let admin_id = ensure_user(&pool, "admin@greencart.local", "admin1234", UserRole::Admin).await?;
    let consumer_id =
        ensure_user(&pool, "client@greencart.local", "client1234", UserRole::Consumer).await?;
    ensure_cart(&pool, consumer_id).await?;
    let producer_id =
        ensure_user(&pool, "ferme@greencart.local", "ferme1234", UserRole::Producer).await?;

    seed_categories(&pool).await?;
    seed_products(&pool, producer_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Consumer ID: {consumer_id}, Producer ID: {producer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;
    let role_text = role.to_value();
    let seller = role.is_seller();
    let (siret, iban, bic) = if seller {
        (Some("12345678901234"), Some("FR7630006000011234567890189"), Some("AGRIFRPP"))
    } else {
        (None, None, None)
    };

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role,
                           account_status, company_name, region, siret, iban, bic)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind("Demo")
    .bind("Account")
    .bind(&role_text)
    // Seeded sellers are approved so the catalog is browsable right away.
    .bind(AccountStatus::Approved.to_value())
    .bind(seller.then_some("Ferme des Collines"))
    .bind(seller.then_some("Occitanie"))
    .bind(siret)
    .bind(iban)
    .bind(bic)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role_text})");
    Ok(id)
}

async fn ensure_cart(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for name in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slugify(name))
        .execute(pool)
        .await?;
    }
    println!("Seeded {} categories", CATEGORIES.len());
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Products already seeded, skipping");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for product in PRODUCTS {
        let category_id: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
                .bind(slugify(product.category))
                .fetch_optional(&mut *tx)
                .await?;

        let product_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO products (id, owner_id, category_id, name, description, price,
                                  original_price, stock, product_type, region, pickup_info,
                                  is_active, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12)
            "#,
        )
        .bind(product_id)
        .bind(owner_id)
        .bind(category_id.map(|(id,)| id))
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.stock)
        .bind(product.product_type)
        .bind("Occitanie")
        .bind("Retrait à la ferme, 17h-19h")
        .bind(product.featured)
        .execute(&mut *tx)
        .await?;

        for (position, (emoji, label)) in product.contents.iter().enumerate() {
            sqlx::query(
                "INSERT INTO product_contents (id, product_id, position, emoji, label) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(position as i32)
            .bind(emoji)
            .bind(label)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    println!("Seeded {} products", PRODUCTS.len());
    Ok(())
}
