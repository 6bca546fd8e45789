//! Insert and select contracts per entity.
//! Insert structs carry only caller-supplied fields; select structs carry every column.
//! Timestamps travel as text (the record service selects them as text on both dialects).

use crate::schema::entities::{APPLICATIONS, CHARACTERS, GUILDS, RAID_BOSSES, USERS};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Binds an insert/select contract pair to its table.
pub trait Entity {
    const TABLE: &'static str;
    type Insert: Serialize + Default;
    type Select: DeserializeOwned + Serialize + Default;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub bnet_id: i64,
    pub battletag: String,
    pub access_token: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub bnet_id: i64,
    pub battletag: String,
    pub access_token: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct Users;

impl Entity for Users {
    const TABLE: &'static str = USERS;
    type Insert = NewUser;
    type Select = User;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewGuild {
    pub name: String,
    pub realm: String,
    pub region: Option<String>,
    pub faction: Option<String>,
    pub raid_progress: Option<Value>,
    pub last_synced: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: i64,
    pub name: String,
    pub realm: String,
    pub region: String,
    pub faction: Option<String>,
    pub raid_progress: Value,
    pub last_synced: Option<String>,
    pub created_at: String,
}

pub struct Guilds;

impl Entity for Guilds {
    const TABLE: &'static str = GUILDS;
    type Insert = NewGuild;
    type Select = Guild;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewCharacter {
    pub guild_id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub realm: String,
    pub class: String,
    pub spec: Option<String>,
    pub role: Option<String>,
    pub rank: Option<i64>,
    pub item_level: Option<i64>,
    pub is_main: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub realm: String,
    pub class: String,
    pub spec: Option<String>,
    pub role: Option<String>,
    pub rank: i64,
    pub item_level: Option<i64>,
    pub is_main: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct Characters;

impl Entity for Characters {
    const TABLE: &'static str = CHARACTERS;
    type Insert = NewCharacter;
    type Select = Character;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewRaidBoss {
    pub guild_id: i64,
    pub raid_name: String,
    pub name: String,
    pub slug: String,
    pub difficulty: Option<String>,
    pub defeated: Option<bool>,
    pub first_kill: Option<String>,
    pub pull_count: Option<i64>,
    pub best_percent: Option<i64>,
    pub sort_order: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RaidBoss {
    pub id: i64,
    pub guild_id: i64,
    pub raid_name: String,
    pub name: String,
    pub slug: String,
    pub difficulty: String,
    pub defeated: bool,
    pub first_kill: Option<String>,
    pub pull_count: i64,
    pub best_percent: Option<i64>,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct RaidBosses;

impl Entity for RaidBosses {
    const TABLE: &'static str = RAID_BOSSES;
    type Insert = NewRaidBoss;
    type Select = RaidBoss;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewApplication {
    pub character_name: String,
    pub realm: String,
    pub class: String,
    pub spec: String,
    pub item_level: Option<i64>,
    pub battletag: String,
    pub contact: Option<String>,
    pub experience: Option<String>,
    pub status: Option<String>,
    pub details: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub character_name: String,
    pub realm: String,
    pub class: String,
    pub spec: String,
    pub item_level: Option<i64>,
    pub battletag: String,
    pub contact: Option<String>,
    pub experience: Option<String>,
    pub status: String,
    pub details: Value,
    pub created_at: String,
}

pub struct Applications;

impl Entity for Applications {
    const TABLE: &'static str = APPLICATIONS;
    type Insert = NewApplication;
    type Select = Application;
}
