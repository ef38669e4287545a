pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod enums;
pub mod favorites;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod product_contents;
pub mod product_images;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use favorites::Entity as Favorites;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_contents::Entity as ProductContents;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use users::Entity as Users;
