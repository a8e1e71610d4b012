use crate::entity::Entity;

pub const PARTITION_KEY: &str = "gear-surf-surfboards";
pub const YAMBA_ROW_KEY: &str = "70b63682-b93a-4c77-aad2-65501347265f";
pub const KIAMA_ROW_KEY: &str = "25a68543-b90c-439d-8332-7ef41e06a0e0";

pub fn yamba_surfboard() -> Entity {
    Entity::new(PARTITION_KEY, YAMBA_ROW_KEY)
        .with("Name", "Yamba Surfboard")
        .with("Quantity", 12)
        .with("Price", 850.00)
        .with("Clearance", false)
}

pub fn kiama_classic_surfboard() -> Entity {
    Entity::new(PARTITION_KEY, KIAMA_ROW_KEY)
        .with("Name", "Kiama Classic Surfboard")
        .with("Quantity", 25)
        .with("Price", 790.00)
        .with("Clearance", true)
}

/// The entities upserted by the workflow, in upsert order.
pub fn surfboards() -> Vec<Entity> {
    vec![yamba_surfboard(), kiama_classic_surfboard()]
}
