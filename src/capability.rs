//! Capability set granted to a user by the identity oracle.

use bitflags::bitflags;
use serde::Deserialize;

bitflags! {
    /// Tagged set of capabilities held by a user.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// May join teams and play quests.
        const PLAYER = 1 << 0;
        /// May score finished quests.
        const JUDGE = 1 << 1;
        /// May author game definitions.
        const CREATOR = 1 << 2;
        /// May accept or reject game definitions.
        const MODERATOR = 1 << 3;
        /// May manage the catalogue.
        const MANAGER = 1 << 4;
        /// Administrative access.
        const ADMIN = 1 << 5;
        /// Unrestricted access.
        const SUPER_ADMIN = 1 << 6;
    }
}

impl Capabilities {
    /// Capabilities allowed to import or delete catalogue entries.
    pub const CATALOG: Capabilities = Capabilities::MODERATOR
        .union(Capabilities::MANAGER)
        .union(Capabilities::ADMIN)
        .union(Capabilities::SUPER_ADMIN);

    /// Combine the flags granted to the user directly with those of their group.
    pub fn resolve(user: Capabilities, group: Capabilities) -> Capabilities {
        user | group
    }

    /// Whether every flag in `capability` is present.
    pub fn has(&self, capability: Capabilities) -> bool {
        self.contains(capability)
    }

    /// Whether at least one flag in `any` is present.
    pub fn has_any(&self, any: Capabilities) -> bool {
        self.intersects(any)
    }
}

/// Named capability as it appears in configuration files and oracle responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// See [`Capabilities::PLAYER`].
    Player,
    /// See [`Capabilities::JUDGE`].
    Judge,
    /// See [`Capabilities::CREATOR`].
    Creator,
    /// See [`Capabilities::MODERATOR`].
    Moderator,
    /// See [`Capabilities::MANAGER`].
    Manager,
    /// See [`Capabilities::ADMIN`].
    Admin,
    /// See [`Capabilities::SUPER_ADMIN`].
    SuperAdmin,
}

impl From<Capability> for Capabilities {
    fn from(value: Capability) -> Self {
        match value {
            Capability::Player => Capabilities::PLAYER,
            Capability::Judge => Capabilities::JUDGE,
            Capability::Creator => Capabilities::CREATOR,
            Capability::Moderator => Capabilities::MODERATOR,
            Capability::Manager => Capabilities::MANAGER,
            Capability::Admin => Capabilities::ADMIN,
            Capability::SuperAdmin => Capabilities::SUPER_ADMIN,
        }
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Capabilities::empty(), |acc, cap| acc | cap.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_merges_user_and_group_flags() {
        let caps = Capabilities::resolve(Capabilities::PLAYER, Capabilities::JUDGE);
        assert!(caps.has(Capabilities::PLAYER));
        assert!(caps.has(Capabilities::JUDGE));
        assert!(!caps.has(Capabilities::ADMIN));
    }

    #[test]
    fn catalog_access_accepts_any_staff_role() {
        assert!(Capabilities::MANAGER.has_any(Capabilities::CATALOG));
        assert!(Capabilities::SUPER_ADMIN.has_any(Capabilities::CATALOG));
        assert!(!Capabilities::PLAYER.has_any(Capabilities::CATALOG));
    }

    #[test]
    fn names_collect_into_set() {
        let names: Vec<Capability> =
            serde_json::from_str(r#"["player", "super_admin"]"#).unwrap();
        let caps: Capabilities = names.into_iter().collect();
        assert_eq!(caps, Capabilities::PLAYER | Capabilities::SUPER_ADMIN);
    }
}
