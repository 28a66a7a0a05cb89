use std::collections::HashMap;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: i64,
    pub display_name: String,
    #[serde(default)]
    pub is_npc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub faction_id: i64,
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<i64>,
}

impl Faction {
    /// True when no human identity belongs to the faction.
    pub fn is_everyone_npc(&self, identities: &IdentityRegistry) -> bool {
        self.members
            .iter()
            .all(|member| identities.is_npc(*member))
    }
}

/// Resource: every known player and NPC identity.
#[derive(Resource, Debug, Default, Clone)]
pub struct IdentityRegistry {
    identities: HashMap<i64, Identity>,
}

impl IdentityRegistry {
    pub fn insert(&mut self, identity: Identity) {
        self.identities.insert(identity.identity_id, identity);
    }

    pub fn get(&self, identity_id: i64) -> Option<&Identity> {
        self.identities.get(&identity_id)
    }

    /// Unknown identities are treated as human.
    pub fn is_npc(&self, identity_id: i64) -> bool {
        self.get(identity_id)
            .map(|identity| identity.is_npc)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }
}

/// Resource: factions and the identity -> faction membership index.
#[derive(Resource, Debug, Default, Clone)]
pub struct FactionRegistry {
    factions: HashMap<i64, Faction>,
    membership: HashMap<i64, i64>,
}

impl FactionRegistry {
    pub fn insert(&mut self, faction: Faction) {
        for member in &faction.members {
            self.membership.insert(*member, faction.faction_id);
        }
        self.factions.insert(faction.faction_id, faction);
    }

    pub fn get(&self, faction_id: i64) -> Option<&Faction> {
        self.factions.get(&faction_id)
    }

    pub fn faction_of(&self, identity_id: i64) -> Option<&Faction> {
        let faction_id = self.membership.get(&identity_id)?;
        self.factions.get(faction_id)
    }

    pub fn tag_of(&self, identity_id: i64) -> Option<&str> {
        self.faction_of(identity_id).map(|faction| faction.tag.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, name: &str, is_npc: bool) -> Identity {
        Identity {
            identity_id: id,
            display_name: name.to_string(),
            is_npc,
        }
    }

    #[test]
    fn membership_index_follows_inserted_factions() {
        let mut factions = FactionRegistry::default();
        factions.insert(Faction {
            faction_id: 500,
            tag: "SPRT".to_string(),
            name: "Space Pirates".to_string(),
            members: vec![10, 11],
        });

        assert_eq!(factions.tag_of(10), Some("SPRT"));
        assert_eq!(factions.tag_of(11), Some("SPRT"));
        assert_eq!(factions.tag_of(12), None);
    }

    #[test]
    fn faction_is_npc_only_when_every_member_is() {
        let mut identities = IdentityRegistry::default();
        identities.insert(identity(1, "Drone", true));
        identities.insert(identity(2, "Alice", false));

        let mixed = Faction {
            faction_id: 9,
            tag: "MIX".to_string(),
            name: "Mixed".to_string(),
            members: vec![1, 2],
        };
        let bots = Faction {
            members: vec![1],
            ..mixed.clone()
        };

        assert!(!mixed.is_everyone_npc(&identities));
        assert!(bots.is_everyone_npc(&identities));
    }
}
