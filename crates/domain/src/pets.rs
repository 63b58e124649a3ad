//! Pets saved on customer profiles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, PetId};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

/// Kind of animal. Parsing is case-insensitive and never fails: anything
/// unrecognized is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PetType {
    Dog,
    Cat,
    Bird,
    Fish,
    Hamster,
    Rabbit,
    #[default]
    Other,
}

impl PetType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DOG" => PetType::Dog,
            "CAT" => PetType::Cat,
            "BIRD" => PetType::Bird,
            "FISH" => PetType::Fish,
            "HAMSTER" => PetType::Hamster,
            "RABBIT" => PetType::Rabbit,
            _ => PetType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PetType::Dog => "DOG",
            PetType::Cat => "CAT",
            PetType::Bird => "BIRD",
            PetType::Fish => "FISH",
            PetType::Hamster => "HAMSTER",
            PetType::Rabbit => "RABBIT",
            PetType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for PetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PetType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PetType::parse(&raw))
    }
}

/// A pet owned by a registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    pub owner: CustomerId,
    pub name: String,
    pub pet_type: PetType,
    pub breed: Option<String>,
    /// Kilograms.
    pub weight: Option<f64>,
}

impl Pet {
    pub fn new(owner: CustomerId, name: impl Into<String>, pet_type: PetType) -> Self {
        Self {
            id: PetId::new(),
            owner,
            name: name.into(),
            pet_type,
            breed: None,
            weight: None,
        }
    }

    pub fn breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn weight(mut self, kilograms: f64) -> Self {
        self.weight = Some(kilograms);
        self
    }
}

/// Read access to customers' saved pets.
#[async_trait]
pub trait PetDirectory: Send + Sync {
    async fn pet(&self, id: PetId) -> Option<Pet>;

    async fn pets_of(&self, owner: CustomerId) -> Vec<Pet>;
}

#[derive(Clone, Default)]
pub struct InMemoryPetDirectory {
    pets: Arc<RwLock<HashMap<PetId, Pet>>>,
}

impl InMemoryPetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, pet: Pet) -> PetId {
        let id = pet.id;
        self.pets.write().await.insert(id, pet);
        id
    }
}

#[async_trait]
impl PetDirectory for InMemoryPetDirectory {
    async fn pet(&self, id: PetId) -> Option<Pet> {
        self.pets.read().await.get(&id).cloned()
    }

    async fn pets_of(&self, owner: CustomerId) -> Vec<Pet> {
        let mut pets: Vec<Pet> = self
            .pets
            .read()
            .await
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.name.cmp(&b.name));
        pets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_type_parsing_is_lenient() {
        assert_eq!(PetType::parse("dog"), PetType::Dog);
        assert_eq!(PetType::parse(" Cat "), PetType::Cat);
        assert_eq!(PetType::parse("HAMSTER"), PetType::Hamster);
        assert_eq!(PetType::parse("iguana"), PetType::Other);
        assert_eq!(PetType::parse(""), PetType::Other);
    }

    #[test]
    fn pet_type_wire_format() {
        assert_eq!(serde_json::to_value(PetType::Rabbit).unwrap(), "RABBIT");
        let parsed: PetType = serde_json::from_value(serde_json::json!("bird")).unwrap();
        assert_eq!(parsed, PetType::Bird);
    }

    #[tokio::test]
    async fn directory_lists_only_the_owners_pets() {
        let directory = InMemoryPetDirectory::new();
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        let rex = directory
            .add(Pet::new(alice, "Rex", PetType::Dog).weight(12.0))
            .await;
        directory.add(Pet::new(alice, "Mittens", PetType::Cat)).await;
        directory.add(Pet::new(bob, "Nibbles", PetType::Hamster)).await;

        let names: Vec<String> = directory
            .pets_of(alice)
            .await
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Mittens", "Rex"]);
        assert_eq!(directory.pet(rex).await.unwrap().weight, Some(12.0));
        assert!(directory.pet(PetId::new()).await.is_none());
    }
}
