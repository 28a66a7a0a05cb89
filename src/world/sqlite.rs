use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::components::block::BlockDefinition;
use crate::components::world::BlockPosition;
use crate::core::world::{BlockBlueprint, GridBlueprint, WorldSnapshot};
use crate::simulation::identity::{Faction, Identity};

const WORLD_SCHEMA_VERSION: i64 = 1;

const WORLD_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS world_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS identities (
  identity_id INTEGER PRIMARY KEY,
  display_name TEXT NOT NULL,
  is_npc INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS factions (
  faction_id INTEGER PRIMARY KEY,
  tag TEXT NOT NULL,
  name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS faction_members (
  faction_id INTEGER NOT NULL,
  identity_id INTEGER NOT NULL,
  PRIMARY KEY (faction_id, identity_id)
);

CREATE TABLE IF NOT EXISTS grids (
  grid_id INTEGER PRIMARY KEY,
  display_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grid_owners (
  grid_id INTEGER NOT NULL,
  identity_id INTEGER NOT NULL,
  is_big_owner INTEGER NOT NULL,
  PRIMARY KEY (grid_id, identity_id)
);

CREATE TABLE IF NOT EXISTS blocks (
  block_id INTEGER PRIMARY KEY AUTOINCREMENT,
  grid_id INTEGER NOT NULL,
  type_id TEXT NOT NULL,
  subtype_id TEXT NOT NULL,
  pair_name TEXT NOT NULL,
  max_integrity REAL NOT NULL,
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  z INTEGER NOT NULL,
  owner_id INTEGER NOT NULL,
  built_by INTEGER NOT NULL,
  enabled INTEGER
);
"#;

#[derive(Debug, Error)]
pub enum WorldDbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    InvalidData(String),
}

pub struct WorldDb {
    conn: Connection,
}

impl WorldDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorldDbError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, WorldDbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, WorldDbError> {
        let mut db = Self { conn };
        db.conn.execute_batch(WORLD_DB_SCHEMA)?;
        db.ensure_world_meta()?;
        Ok(db)
    }

    pub fn load_snapshot(&self) -> Result<WorldSnapshot, WorldDbError> {
        Ok(WorldSnapshot {
            identities: self.load_identities()?,
            factions: self.load_factions()?,
            grids: self.load_grids()?,
        })
    }

    /// Replace everything stored with `snapshot`.
    pub fn save_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), WorldDbError> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM identities", [])?;
        for identity in &snapshot.identities {
            tx.execute(
                "INSERT INTO identities (identity_id, display_name, is_npc) VALUES (?1, ?2, ?3)",
                params![
                    identity.identity_id,
                    identity.display_name,
                    if identity.is_npc { 1 } else { 0 }
                ],
            )?;
        }

        tx.execute("DELETE FROM factions", [])?;
        tx.execute("DELETE FROM faction_members", [])?;
        for faction in &snapshot.factions {
            tx.execute(
                "INSERT INTO factions (faction_id, tag, name) VALUES (?1, ?2, ?3)",
                params![faction.faction_id, faction.tag, faction.name],
            )?;
            for member in &faction.members {
                tx.execute(
                    "INSERT INTO faction_members (faction_id, identity_id) VALUES (?1, ?2)",
                    params![faction.faction_id, member],
                )?;
            }
        }

        tx.execute("DELETE FROM grids", [])?;
        tx.execute("DELETE FROM grid_owners", [])?;
        tx.execute("DELETE FROM blocks", [])?;
        for grid in &snapshot.grids {
            tx.execute(
                "INSERT INTO grids (grid_id, display_name) VALUES (?1, ?2)",
                params![grid.grid_id, grid.display_name],
            )?;
            for owner in &grid.big_owners {
                tx.execute(
                    "INSERT INTO grid_owners (grid_id, identity_id, is_big_owner) VALUES (?1, ?2, 1)",
                    params![grid.grid_id, owner],
                )?;
            }
            for owner in grid.small_owners.iter().filter(|o| !grid.big_owners.contains(o)) {
                tx.execute(
                    "INSERT INTO grid_owners (grid_id, identity_id, is_big_owner) VALUES (?1, ?2, 0)",
                    params![grid.grid_id, owner],
                )?;
            }
            for block in &grid.blocks {
                tx.execute(
                    "INSERT INTO blocks (grid_id, type_id, subtype_id, pair_name, max_integrity, x, y, z, owner_id, built_by, enabled) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        grid.grid_id,
                        block.definition.type_id,
                        block.definition.subtype_id,
                        block.definition.pair_name,
                        block.definition.max_integrity as f64,
                        block.position.x,
                        block.position.y,
                        block.position.z,
                        block.owner_id,
                        block.built_by,
                        block.functional.map(|enabled| if enabled { 1 } else { 0 })
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn ensure_world_meta(&mut self) -> Result<(), WorldDbError> {
        let version: Option<i64> = self
            .conn
            .query_row(
                "SELECT schema_version FROM world_meta WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match version {
            None => {
                self.conn.execute(
                    "INSERT INTO world_meta (id, schema_version) VALUES (1, ?1)",
                    params![WORLD_SCHEMA_VERSION],
                )?;
                Ok(())
            }
            Some(WORLD_SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(WorldDbError::InvalidData(format!(
                "unsupported world schema version {} (expected {})",
                other, WORLD_SCHEMA_VERSION
            ))),
        }
    }

    fn load_identities(&self) -> Result<Vec<Identity>, WorldDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT identity_id, display_name, is_npc FROM identities ORDER BY identity_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Identity {
                identity_id: row.get(0)?,
                display_name: row.get(1)?,
                is_npc: row.get::<_, i64>(2)? != 0,
            })
        })?;
        let mut identities = Vec::new();
        for row in rows {
            identities.push(row?);
        }
        Ok(identities)
    }

    fn load_factions(&self) -> Result<Vec<Faction>, WorldDbError> {
        let mut members: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT faction_id, identity_id FROM faction_members ORDER BY faction_id, identity_id",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let faction_id: i64 = row.get(0)?;
            members.entry(faction_id).or_default().push(row.get(1)?);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT faction_id, tag, name FROM factions ORDER BY faction_id")?;
        let mut rows = stmt.query([])?;
        let mut factions = Vec::new();
        while let Some(row) = rows.next()? {
            let faction_id: i64 = row.get(0)?;
            factions.push(Faction {
                faction_id,
                tag: row.get(1)?,
                name: row.get(2)?,
                members: members.remove(&faction_id).unwrap_or_default(),
            });
        }
        Ok(factions)
    }

    fn load_grids(&self) -> Result<Vec<GridBlueprint>, WorldDbError> {
        let mut owners = self.load_grid_owners()?;
        let mut blocks = self.load_blocks()?;

        let mut stmt = self
            .conn
            .prepare("SELECT grid_id, display_name FROM grids ORDER BY grid_id")?;
        let mut rows = stmt.query([])?;
        let mut grids = Vec::new();
        while let Some(row) = rows.next()? {
            let grid_id: i64 = row.get(0)?;
            let display_name: String = row.get(1)?;
            let (big_owners, small_owners) = owners.remove(&grid_id).unwrap_or_default();
            grids.push(GridBlueprint {
                grid_id,
                display_name,
                big_owners,
                small_owners,
                blocks: blocks.remove(&grid_id).unwrap_or_default(),
            });
        }

        if let Some(orphan) = blocks.keys().next() {
            return Err(WorldDbError::InvalidData(format!(
                "blocks reference unknown grid {}",
                orphan
            )));
        }
        Ok(grids)
    }

    /// grid id -> (big owners, every owner)
    fn load_grid_owners(&self) -> Result<HashMap<i64, (Vec<i64>, Vec<i64>)>, WorldDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT grid_id, identity_id, is_big_owner FROM grid_owners ORDER BY grid_id, is_big_owner DESC, identity_id",
        )?;
        let mut rows = stmt.query([])?;
        let mut owners: HashMap<i64, (Vec<i64>, Vec<i64>)> = HashMap::new();
        while let Some(row) = rows.next()? {
            let grid_id: i64 = row.get(0)?;
            let identity_id: i64 = row.get(1)?;
            let is_big = row.get::<_, i64>(2)? != 0;
            let entry = owners.entry(grid_id).or_default();
            if is_big {
                entry.0.push(identity_id);
            }
            entry.1.push(identity_id);
        }
        Ok(owners)
    }

    fn load_blocks(&self) -> Result<HashMap<i64, Vec<BlockBlueprint>>, WorldDbError> {
        let mut stmt = self.conn.prepare(
            "SELECT grid_id, type_id, subtype_id, pair_name, max_integrity, x, y, z, owner_id, built_by, enabled FROM blocks ORDER BY block_id",
        )?;
        let mut rows = stmt.query([])?;
        let mut blocks: HashMap<i64, Vec<BlockBlueprint>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let grid_id: i64 = row.get(0)?;
            let max_integrity = row.get::<_, f64>(4)?;
            if max_integrity <= 0.0 {
                return Err(WorldDbError::InvalidData(format!(
                    "block on grid {} has non-positive max integrity {}",
                    grid_id, max_integrity
                )));
            }
            let definition = BlockDefinition {
                type_id: row.get(1)?,
                subtype_id: row.get(2)?,
                pair_name: row.get(3)?,
                max_integrity: max_integrity as f32,
            };
            blocks.entry(grid_id).or_default().push(BlockBlueprint {
                definition,
                position: BlockPosition {
                    x: row.get(5)?,
                    y: row.get(6)?,
                    z: row.get(7)?,
                },
                owner_id: row.get(8)?,
                built_by: row.get(9)?,
                functional: row.get::<_, Option<i64>>(10)?.map(|enabled| enabled != 0),
            });
        }
        Ok(blocks)
    }
}

impl crate::world::repository::WorldRepository for WorldDb {
    fn load_snapshot(&self) -> Result<WorldSnapshot, Box<dyn std::error::Error>> {
        Ok(WorldDb::load_snapshot(self)?)
    }

    fn save_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), Box<dyn std::error::Error>> {
        Ok(WorldDb::save_snapshot(self, snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::repository::WorldRepository;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            identities: vec![
                Identity {
                    identity_id: 1,
                    display_name: "Alice".to_string(),
                    is_npc: false,
                },
                Identity {
                    identity_id: 2,
                    display_name: "Drone".to_string(),
                    is_npc: true,
                },
            ],
            factions: vec![Faction {
                faction_id: 300,
                tag: "MINE".to_string(),
                name: "Miners Guild".to_string(),
                members: vec![1, 2],
            }],
            grids: vec![GridBlueprint {
                grid_id: 100,
                display_name: "Hauler".to_string(),
                big_owners: vec![1],
                small_owners: vec![1, 2],
                blocks: vec![
                    BlockBlueprint::basic("Reactor", 1).functional(true).at(0, 1, 2),
                    BlockBlueprint::basic("Armor", 2).built_by(1),
                ],
            }],
        }
    }

    #[test]
    fn stored_world_loads_back() {
        let mut db = WorldDb::open_in_memory().unwrap();
        db.save_snapshot(&snapshot()).unwrap();

        let loaded = db.load_snapshot().unwrap();

        assert_eq!(loaded.identities, snapshot().identities);
        assert_eq!(loaded.factions, snapshot().factions);
        let grid = &loaded.grids[0];
        assert_eq!(grid.display_name, "Hauler");
        assert_eq!(grid.big_owners, vec![1]);
        assert_eq!(grid.small_owners, vec![1, 2]);
        assert_eq!(grid.blocks.len(), 2);
        assert_eq!(grid.blocks[0].functional, Some(true));
        assert_eq!(grid.blocks[0].position, BlockPosition { x: 0, y: 1, z: 2 });
        assert_eq!(grid.blocks[1].functional, None);
        assert_eq!(grid.blocks[1].owner_id, 2);
        assert_eq!(grid.blocks[1].built_by, 1);
    }

    #[test]
    fn saving_replaces_previous_contents() {
        let mut db = WorldDb::open_in_memory().unwrap();
        db.save_snapshot(&snapshot()).unwrap();
        db.save_snapshot(&WorldSnapshot::default()).unwrap();

        let loaded = db.load_snapshot().unwrap();
        assert!(loaded.identities.is_empty());
        assert!(loaded.factions.is_empty());
        assert!(loaded.grids.is_empty());
    }

    #[test]
    fn reopening_a_file_keeps_the_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.db");
        {
            let mut db = WorldDb::open(&path).unwrap();
            WorldRepository::save_snapshot(&mut db, &snapshot()).unwrap();
        }

        let db = WorldDb::open(&path).unwrap();
        let loaded = WorldRepository::load_snapshot(&db).unwrap();
        assert_eq!(loaded.grids.len(), 1);
    }

    #[test]
    fn orphan_blocks_are_rejected() {
        let db = WorldDb::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO blocks (grid_id, type_id, subtype_id, pair_name, max_integrity, x, y, z, owner_id, built_by, enabled) VALUES (7, 'Reactor', 'Reactor', 'Reactor', 10.0, 0, 0, 0, 1, 1, NULL)",
                [],
            )
            .unwrap();

        assert!(matches!(db.load_snapshot(), Err(WorldDbError::InvalidData(_))));
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.db");
        {
            let db = WorldDb::open(&path).unwrap();
            db.conn
                .execute("UPDATE world_meta SET schema_version = 99 WHERE id = 1", [])
                .unwrap();
        }

        assert!(matches!(WorldDb::open(&path), Err(WorldDbError::InvalidData(_))));
    }
}
