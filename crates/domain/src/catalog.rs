//! Grooming and spa services offered for booking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ServiceId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::booking::Money;
use crate::pets::PetType;

/// One weight band of a service's price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub name: String,
    /// `None` applies to every pet type the service accepts.
    pub pet_type: Option<PetType>,
    /// Kilograms, inclusive.
    pub min_weight: f64,
    /// Kilograms, inclusive.
    pub max_weight: f64,
    pub price: Money,
}

impl PricingTier {
    pub fn new(name: impl Into<String>, min_weight: f64, max_weight: f64, price: Money) -> Self {
        Self {
            name: name.into(),
            pet_type: None,
            min_weight,
            max_weight,
            price,
        }
    }

    pub fn for_pet_type(mut self, pet_type: PetType) -> Self {
        self.pet_type = Some(pet_type);
        self
    }

    pub fn contains(&self, weight: f64) -> bool {
        weight >= self.min_weight && weight <= self.max_weight
    }

    fn applies_to(&self, pet_type: PetType) -> bool {
        self.pet_type.is_none_or(|t| t == pet_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    /// Empty means every pet type is accepted.
    pub pet_types: Vec<PetType>,
    pub display_order: i32,
    pub active: bool,
    pub tiers: Vec<PricingTier>,
}

impl Service {
    pub fn new(name: impl Into<String>, duration_minutes: u32) -> Self {
        let name = name.into();
        Self {
            id: ServiceId::new(),
            slug: slugify(&name),
            name,
            description: None,
            duration_minutes,
            pet_types: Vec::new(),
            display_order: 0,
            active: true,
            tiers: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn for_pet_types(mut self, pet_types: impl IntoIterator<Item = PetType>) -> Self {
        self.pet_types = pet_types.into_iter().collect();
        self
    }

    pub fn display_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    pub fn tier(mut self, tier: PricingTier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn accepts(&self, pet_type: PetType) -> bool {
        self.pet_types.is_empty() || self.pet_types.contains(&pet_type)
    }

    /// Chooses the tier that prices a pet.
    ///
    /// Among tiers applicable to the pet type, ordered by weight: the first
    /// tier containing the weight; otherwise the first tier whose upper bound
    /// is above it; otherwise the heaviest tier. `None` only when no tier
    /// applies to the pet type at all.
    pub fn tier_for(&self, pet_type: PetType, weight: f64) -> Option<&PricingTier> {
        let mut applicable: Vec<&PricingTier> =
            self.tiers.iter().filter(|t| t.applies_to(pet_type)).collect();
        applicable.sort_by(|a, b| a.min_weight.total_cmp(&b.min_weight));

        applicable
            .iter()
            .find(|t| t.contains(weight))
            .or_else(|| applicable.iter().find(|t| t.max_weight >= weight))
            .or_else(|| applicable.last())
            .copied()
    }

    /// Cheapest and dearest tier prices.
    pub fn price_range(&self) -> Option<(Money, Money)> {
        let min = self.tiers.iter().map(|t| t.price).min()?;
        let max = self.tiers.iter().map(|t| t.price).max()?;
        Some((min, max))
    }
}

fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Read access to the service catalog.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Looks up a service whether or not it is active.
    async fn service(&self, id: ServiceId) -> Option<Service>;

    /// Active services in display order.
    async fn services(&self) -> Vec<Service>;
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    services: Arc<RwLock<HashMap<ServiceId, Service>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with the salon's standard menu.
    pub async fn seeded() -> Self {
        let catalog = Self::new();
        for service in standard_menu() {
            catalog.add(service).await;
        }
        catalog
    }

    pub async fn add(&self, service: Service) -> ServiceId {
        let id = service.id;
        self.services.write().await.insert(id, service);
        id
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryCatalog {
    async fn service(&self, id: ServiceId) -> Option<Service> {
        self.services.read().await.get(&id).cloned()
    }

    async fn services(&self) -> Vec<Service> {
        let mut services: Vec<Service> = self
            .services
            .read()
            .await
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect();
        services.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        services
    }
}

fn standard_menu() -> Vec<Service> {
    vec![
        Service::new("Bath & Brush", 60)
            .description("Shampoo, blow-dry and a full brush-out")
            .for_pet_types([PetType::Dog, PetType::Cat])
            .display_order(1)
            .tier(PricingTier::new("Small", 0.0, 10.0, Money::from_dollars(25)))
            .tier(PricingTier::new("Medium", 10.01, 25.0, Money::from_dollars(35)))
            .tier(PricingTier::new("Large", 25.01, 45.0, Money::from_dollars(45))),
        Service::new("Full Groom", 90)
            .description("Bath, haircut, nail trim and ear cleaning")
            .for_pet_types([PetType::Dog])
            .display_order(2)
            .tier(PricingTier::new("Small", 0.0, 10.0, Money::from_dollars(45)))
            .tier(PricingTier::new("Medium", 10.01, 25.0, Money::from_dollars(60)))
            .tier(PricingTier::new("Large", 25.01, 45.0, Money::from_dollars(80))),
        Service::new("Nail Trim", 30)
            .display_order(3)
            .tier(PricingTier::new("Any size", 0.0, 100.0, Money::from_dollars(15))),
        Service::new("Spa Day", 120)
            .description("Full groom with conditioning mask and paw balm")
            .for_pet_types([PetType::Dog, PetType::Cat])
            .display_order(4)
            .tier(
                PricingTier::new("Cat", 0.0, 15.0, Money::from_dollars(70))
                    .for_pet_type(PetType::Cat),
            )
            .tier(PricingTier::new("Small dog", 0.0, 10.0, Money::from_dollars(75)).for_pet_type(PetType::Dog))
            .tier(PricingTier::new("Large dog", 10.01, 45.0, Money::from_dollars(95)).for_pet_type(PetType::Dog)),
        Service::new("Flea Treatment", 45)
            .display_order(5)
            .tier(PricingTier::new("Any size", 0.0, 100.0, Money::from_dollars(30)))
            .inactive(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bath() -> Service {
        Service::new("Bath & Brush", 60)
            .for_pet_types([PetType::Dog, PetType::Cat])
            .tier(PricingTier::new("Large", 25.01, 45.0, Money::from_dollars(45)))
            .tier(PricingTier::new("Small", 0.0, 10.0, Money::from_dollars(25)))
            .tier(PricingTier::new("Medium", 10.01, 25.0, Money::from_dollars(35)))
    }

    #[test]
    fn weight_selects_the_containing_tier() {
        let service = bath();
        assert_eq!(service.tier_for(PetType::Dog, 4.0).unwrap().name, "Small");
        assert_eq!(service.tier_for(PetType::Dog, 10.0).unwrap().name, "Small");
        assert_eq!(service.tier_for(PetType::Dog, 18.5).unwrap().name, "Medium");
        assert_eq!(service.tier_for(PetType::Cat, 25.01).unwrap().name, "Large");
    }

    #[test]
    fn heavier_than_every_tier_uses_the_heaviest() {
        assert_eq!(bath().tier_for(PetType::Dog, 80.0).unwrap().name, "Large");
    }

    #[test]
    fn weight_in_a_gap_rounds_up() {
        assert_eq!(bath().tier_for(PetType::Dog, 10.005).unwrap().name, "Medium");
    }

    #[test]
    fn typed_tiers_only_price_their_pet_type() {
        let service = Service::new("Spa Day", 120)
            .tier(PricingTier::new("Cat", 0.0, 15.0, Money::from_dollars(70)).for_pet_type(PetType::Cat))
            .tier(PricingTier::new("Dog", 0.0, 45.0, Money::from_dollars(90)).for_pet_type(PetType::Dog));

        assert_eq!(service.tier_for(PetType::Cat, 5.0).unwrap().name, "Cat");
        assert_eq!(service.tier_for(PetType::Dog, 5.0).unwrap().name, "Dog");
        assert!(service.tier_for(PetType::Rabbit, 2.0).is_none());
    }

    #[test]
    fn empty_pet_types_accept_everything() {
        let nails = Service::new("Nail Trim", 30);
        assert!(nails.accepts(PetType::Rabbit));
        assert!(bath().accepts(PetType::Cat));
        assert!(!bath().accepts(PetType::Bird));
    }

    #[test]
    fn slug_and_price_range() {
        let service = bath();
        assert_eq!(service.slug, "bath-brush");
        assert_eq!(
            service.price_range(),
            Some((Money::from_dollars(25), Money::from_dollars(45)))
        );
    }

    #[tokio::test]
    async fn seeded_catalog_lists_active_services_in_order() {
        let catalog = InMemoryCatalog::seeded().await;
        let names: Vec<String> = catalog.services().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Bath & Brush", "Full Groom", "Nail Trim", "Spa Day"]);
    }

    #[tokio::test]
    async fn inactive_services_can_still_be_looked_up() {
        let catalog = InMemoryCatalog::new();
        let id = catalog.add(Service::new("Retired", 30).inactive()).await;
        assert!(!catalog.service(id).await.unwrap().active);
        assert!(catalog.services().await.is_empty());
    }
}
