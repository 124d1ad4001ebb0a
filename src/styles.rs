use eframe::egui::Color32;

use crate::model::PathType;

/// Visual classification for a path item shown in transfer UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemStyles {
    pub icon: IconKind,
    pub tint: Color32,
    pub owned_by_self: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IconKind {
    FolderPersonal,
    FolderShared,
    FolderPublic,
    FolderTeam,
    File,
    Symlink,
    Placeholder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visibility {
    Private,
    Public,
    Team,
}

const TINT_PRIVATE: Color32 = Color32::from_rgb(76, 142, 255);
const TINT_PUBLIC: Color32 = Color32::from_rgb(168, 207, 54);
const TINT_NEUTRAL: Color32 = Color32::from_rgb(220, 220, 220);

fn visibility(segments: &[&str]) -> Visibility {
    match segments.get(1).copied() {
        Some("public") => Visibility::Public,
        Some("team") => Visibility::Team,
        _ => Visibility::Private,
    }
}

/// Writers are the part of a folder name before `#`; readers after it do not
/// count as owners. `/loft/private/alice,bob#carol` is written by alice and
/// bob and readable by carol.
fn folder_writers<'a>(segments: &[&'a str]) -> Vec<&'a str> {
    let Some(folder) = segments.get(2) else {
        return Vec::new();
    };
    let writers = folder.split('#').next().unwrap_or("");
    writers.split(',').filter(|s| !s.is_empty()).collect()
}

fn is_owned_by_self(segments: &[&str], username: Option<&str>) -> bool {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return false;
    };
    folder_writers(segments).iter().any(|w| *w == username)
}

fn folder_icon(segments: &[&str], username: Option<&str>) -> IconKind {
    match visibility(segments) {
        Visibility::Team => IconKind::FolderTeam,
        Visibility::Public => IconKind::FolderPublic,
        Visibility::Private => {
            let writers = folder_writers(segments);
            let sole_self = writers.len() == 1
                && username.filter(|u| !u.is_empty()).map(|u| writers[0] == u) == Some(true);
            if sole_self {
                IconKind::FolderPersonal
            } else {
                IconKind::FolderShared
            }
        }
    }
}

/// Derives icon and color styling for a path item. Deterministic in its
/// inputs; the same (segments, type, username) triple always yields the same
/// descriptor.
pub fn item_styles(segments: &[&str], ptype: PathType, username: Option<&str>) -> ItemStyles {
    let owned_by_self = is_owned_by_self(segments, username);
    let icon = match ptype {
        PathType::Folder => folder_icon(segments, username),
        PathType::File => IconKind::File,
        PathType::Symlink => IconKind::Symlink,
        PathType::Unknown => IconKind::Placeholder,
    };
    let tint = match ptype {
        PathType::Folder => match visibility(segments) {
            Visibility::Public => TINT_PUBLIC,
            Visibility::Private | Visibility::Team => TINT_PRIVATE,
        },
        _ => TINT_NEUTRAL,
    };
    ItemStyles {
        icon,
        tint,
        owned_by_self,
    }
}

impl IconKind {
    /// Glyph drawn in place of an image asset.
    pub fn glyph(self) -> &'static str {
        match self {
            IconKind::FolderPersonal => "\u{1F3E0}",
            IconKind::FolderShared | IconKind::FolderTeam => "\u{1F4C1}",
            IconKind::FolderPublic => "\u{1F310}",
            IconKind::File => "\u{1F4C4}",
            IconKind::Symlink => "\u{1F517}",
            IconKind::Placeholder => "\u{2753}",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::path_segments;

    #[test]
    fn unknown_item_in_own_private_folder() {
        let segments = path_segments("/loft/private/alice/doc.txt");
        let styles = item_styles(&segments, PathType::Unknown, Some("alice"));
        assert_eq!(
            styles,
            ItemStyles {
                icon: IconKind::Placeholder,
                tint: TINT_NEUTRAL,
                owned_by_self: true,
            }
        );
    }

    #[test]
    fn personal_folder_needs_sole_self_writer() {
        let own = path_segments("/loft/private/alice");
        assert_eq!(
            item_styles(&own, PathType::Folder, Some("alice")).icon,
            IconKind::FolderPersonal
        );

        let shared = path_segments("/loft/private/alice,bob");
        let styles = item_styles(&shared, PathType::Folder, Some("alice"));
        assert_eq!(styles.icon, IconKind::FolderShared);
        assert!(styles.owned_by_self);
    }

    #[test]
    fn readers_after_hash_are_not_writers() {
        let segments = path_segments("/loft/private/bob#alice");
        let styles = item_styles(&segments, PathType::Folder, Some("alice"));
        assert!(!styles.owned_by_self);
        assert_eq!(styles.icon, IconKind::FolderShared);
    }

    #[test]
    fn public_and_team_folders_pick_their_icons() {
        let public = path_segments("/loft/public/alice");
        let styles = item_styles(&public, PathType::Folder, Some("alice"));
        assert_eq!(styles.icon, IconKind::FolderPublic);
        assert_eq!(styles.tint, TINT_PUBLIC);

        let team = path_segments("/loft/team/acme");
        assert_eq!(
            item_styles(&team, PathType::Folder, None).icon,
            IconKind::FolderTeam
        );
    }

    #[test]
    fn missing_username_never_owns() {
        let segments = path_segments("/loft/private/alice");
        assert!(!item_styles(&segments, PathType::Folder, None).owned_by_self);
        assert!(!item_styles(&segments, PathType::Folder, Some("")).owned_by_self);
    }

    #[test]
    fn short_paths_degrade_to_private_defaults() {
        let styles = item_styles(&["loft"], PathType::Folder, Some("alice"));
        assert_eq!(styles.icon, IconKind::FolderShared);
        assert_eq!(styles.tint, TINT_PRIVATE);
        assert!(!styles.owned_by_self);
    }
}
