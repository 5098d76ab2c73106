//! Built-in schemas for every configurable DAPS module.
//!
//! The order of [`catalog`] is the order modules are listed on the splash
//! page.

use std::sync::OnceLock;

use crate::data::schema::{FieldKind as K, FieldSchema as F, ModuleSchema};

const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error", "critical"];
const ARR_TYPES: &[&str] = &["radarr", "sonarr", "lidarr"];

fn module(key: &str, label: &str, description: &str, fields: Vec<F>) -> ModuleSchema {
    ModuleSchema {
        key: key.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        fields,
    }
}

fn log_level() -> F {
    F::new("log_level", "Log Level", K::Dropdown).options(LOG_LEVELS)
}

fn dry_run() -> F {
    F::new("dry_run", "Dry Run", K::CheckBox)
        .describe("Report what would change without touching any files")
}

fn instance_entry_fields() -> Vec<F> {
    vec![
        F::new("name", "Name", K::Text)
            .required()
            .placeholder("radarr_hd"),
        F::new("url", "URL", K::Text)
            .required()
            .placeholder("http://host:7878"),
        F::new("api", "API Key", K::Password).required(),
    ]
}

/// All module schemas in display order.
pub fn catalog() -> &'static [ModuleSchema] {
    static CATALOG: OnceLock<Vec<ModuleSchema>> = OnceLock::new();
    CATALOG.get_or_init(build)
}

/// Find a module schema by key.
pub fn find(key: &str) -> Option<&'static ModuleSchema> {
    catalog().iter().find(|m| m.key == key)
}

fn build() -> Vec<ModuleSchema> {
    vec![
        module(
            "general",
            "General",
            "Shared settings used by every module",
            vec![
                log_level(),
                F::new("max_logs", "Max Logs", K::Number)
                    .required()
                    .describe("Number of rotated log files to keep"),
                F::new("source_dirs", "Source Directories", K::DirListDragDrop)
                    .required()
                    .describe("Poster source folders, highest priority first"),
                F::new("destination_dir", "Destination Directory", K::Dir).required(),
                F::new("webhook_secret", "Webhook Secret", K::Password).exclude_on_save(),
            ],
        ),
        module(
            "instances",
            "Instances",
            "Radarr, Sonarr, Lidarr and Plex connections",
            vec![
                F::new("radarr", "Radarr", K::GdriveCustom).nested(instance_entry_fields()),
                F::new("sonarr", "Sonarr", K::GdriveCustom).nested(instance_entry_fields()),
                F::new("lidarr", "Lidarr", K::GdriveCustom).nested(instance_entry_fields()),
                F::new("plex", "Plex", K::GdriveCustom).nested(instance_entry_fields()),
            ],
        ),
        module(
            "schedule",
            "Schedule",
            "When each module runs",
            [
                "sync_gdrive",
                "poster_renamerr",
                "border_replacerr",
                "upgradinatorr",
                "renameinatorr",
                "nohl",
                "labelarr",
                "health_checkarr",
                "jduparr",
                "unmatched_assets",
                "poster_cleanarr",
            ]
            .iter()
            .map(|m| F::new(m, m, K::Schedule))
            .collect(),
        ),
        module(
            "notifications",
            "Notifications",
            "Discord and email notification targets",
            vec![
                F::new("discord_webhook", "Discord Webhook", K::Text)
                    .placeholder("https://discord.com/api/webhooks/..."),
                F::new("email_to", "Email Recipient", K::Text),
                F::new("modules", "Notify For", K::Json)
                    .describe("JSON object mapping module names to true/false"),
            ],
        ),
        module(
            "sync_gdrive",
            "Sync GDrive",
            "Mirror poster collections from Google Drive",
            vec![
                log_level(),
                F::new("client_id", "Client ID", K::Text).required(),
                F::new("client_secret", "Client Secret", K::Password).required(),
                F::new("token", "Token", K::TextArea),
                F::new("gdrive_sa_location", "Service Account File", K::Text),
                F::new("gdrive_list", "Google Drive Sources", K::GdriveCustom).nested(vec![
                    F::new("name", "Name", K::Text).required(),
                    F::new("id", "Drive ID", K::Text).required(),
                    F::new("location", "Location", K::Dir).required(),
                ]),
            ],
        ),
        module(
            "poster_renamerr",
            "Poster Renamerr",
            "Match, rename and sort posters into your asset folders",
            vec![
                log_level(),
                dry_run(),
                F::new("sync_posters", "Sync Posters", K::CheckBox),
                F::new("action_type", "Action", K::Dropdown)
                    .options(&["copy", "move", "hardlink", "symlink"])
                    .required(),
                F::new("asset_folders", "Asset Folders", K::CheckBox),
                F::new("border_replacerr", "Run Border Replacerr", K::CheckBox),
                F::new("run_cleanarr", "Run Cleanarr", K::CheckBox),
                F::new("source_dirs", "Source Directories", K::DirListDragDrop).required(),
                F::new("destination_dir", "Destination Directory", K::Dir).required(),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["radarr", "sonarr", "plex"]),
            ],
        ),
        module(
            "border_replacerr",
            "Border Replacerr",
            "Replace or remove poster borders, with seasonal holiday colors",
            vec![
                log_level(),
                dry_run(),
                F::new("source_dirs", "Source Directories", K::DirList),
                F::new("destination_dir", "Destination Directory", K::Dir),
                F::new("border_width", "Border Width", K::Number).required(),
                F::new("skip", "Skip Without Holiday", K::CheckBox),
                F::new("exclusion_list", "Exclusions", K::TextArea),
                F::new("border_colors", "Border Colors", K::ColorList)
                    .required()
                    .preview(),
                F::new("holidays", "Holidays", K::HolidaysCustom).nested(vec![
                    F::new("name", "Holiday", K::Text).required(),
                    F::new("schedule", "Date Range", K::HolidaySchedule).required(),
                    F::new("color", "Colors", K::ColorList).required().preview(),
                ]),
            ],
        ),
        module(
            "upgradinatorr",
            "Upgradinatorr",
            "Search for upgrades a handful of items at a time",
            vec![
                log_level(),
                dry_run(),
                F::new("instances_list", "Instances", K::UpgradinatorrCustom).nested(vec![
                    F::new("instance", "Instance", K::InstanceDropdown)
                        .required()
                        .instance_types(ARR_TYPES),
                    F::new("count", "Count", K::Number).required(),
                    F::new("tag_name", "Tag Name", K::Text).required(),
                    F::new("ignore_tag", "Ignore Tag", K::Text),
                    F::new("unattended", "Unattended", K::CheckBox),
                    F::new("season_monitored_threshold", "Season Threshold", K::Float)
                        .required()
                        .show_if("sonarr")
                        .describe("Fraction of monitored episodes before a season is searched"),
                ]),
            ],
        ),
        module(
            "renameinatorr",
            "Renameinatorr",
            "Rename media through the Arr rename endpoints",
            vec![
                log_level(),
                dry_run(),
                F::new("rename_folders", "Rename Folders", K::CheckBox),
                F::new("count", "Count", K::Number),
                F::new("tag_name", "Tag Name", K::Text),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["radarr", "sonarr"]),
            ],
        ),
        module(
            "nohl",
            "NoHL",
            "Find media that is not hardlinked",
            vec![
                log_level(),
                dry_run(),
                F::new("searches", "Searches", K::Number),
                F::new("print_files", "Print Files", K::CheckBox),
                F::new("source_dirs", "Source Directories", K::DirListOptions)
                    .required()
                    .options(&["scan", "resolve"]),
                F::new("exclude_profiles", "Exclude Profiles", K::TextArea),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["radarr", "sonarr"]),
            ],
        ),
        module(
            "labelarr",
            "Labelarr",
            "Sync Arr tags to Plex labels",
            vec![
                log_level(),
                dry_run(),
                F::new("mappings", "Mappings", K::LabelarrCustom).nested(vec![
                    F::new("app_instance", "App Instance", K::InstanceDropdown)
                        .required()
                        .instance_types(&["radarr", "sonarr"]),
                    F::new("labels", "Labels", K::Text).required(),
                    F::new("plex_instances", "Plex Instances", K::Instances)
                        .required()
                        .instance_types(&["plex"]),
                ]),
            ],
        ),
        module(
            "health_checkarr",
            "Health Checkarr",
            "Remove media flagged as missing from TMDb/TVDb",
            vec![
                log_level(),
                dry_run(),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["radarr", "sonarr"]),
            ],
        ),
        module(
            "jduparr",
            "Jduparr",
            "Hardlink duplicate files with jdupes",
            vec![
                log_level(),
                dry_run(),
                F::new("hash_database", "Hash Database", K::Text),
                F::new("source_dirs", "Source Directories", K::DirList).required(),
            ],
        ),
        module(
            "unmatched_assets",
            "Unmatched Assets",
            "List media that has no poster asset",
            vec![
                log_level(),
                F::new("ignore_root_folders", "Ignore Root Folders", K::TextArea),
                F::new("ignore_collections", "Ignore Collections", K::TextArea),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["radarr", "sonarr", "plex"]),
            ],
        ),
        module(
            "poster_cleanarr",
            "Poster Cleanarr",
            "Remove orphaned posters from Plex metadata",
            vec![
                log_level(),
                dry_run(),
                F::new("mode", "Mode", K::Dropdown)
                    .options(&["report", "move", "remove", "restore", "clear", "nothing"])
                    .required(),
                F::new("plex_path", "Plex Path", K::Dir).required(),
                F::new("instances", "Instances", K::Instances)
                    .required()
                    .instance_types(&["plex"]),
            ],
        ),
        module(
            "user_interface",
            "User Interface",
            "Console appearance",
            vec![
                F::new("theme", "Theme", K::Dropdown)
                    .options(&["dark", "light"])
                    .required(),
                F::new("accent_color", "Accent Color", K::Color),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::check_fields;

    #[test]
    fn test_catalog_is_well_formed() {
        for m in catalog() {
            check_fields(&m.fields).unwrap_or_else(|e| panic!("{}: {e}", m.key));
        }
    }

    #[test]
    fn test_module_keys_unique_and_ordered() {
        let keys: Vec<_> = catalog().iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys.first(), Some(&"general"));
        assert_eq!(keys.last(), Some(&"user_interface"));
        let mut dedup = keys.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), keys.len());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("labelarr").unwrap().label, "Labelarr");
        assert!(find("nope").is_none());
    }
}
