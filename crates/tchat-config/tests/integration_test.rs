//! Integration tests for tchat-config crate.

use tchat_common::test_utils::config_fixtures;
use tchat_common::{ChannelName, LogFormat};
use tchat_config::{Config, ConfigCache, ConfigLoader};

#[test]
fn test_default_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.bot.prefixes.clear();
    assert!(config.validate().is_err());

    config.bot.prefixes = vec!["!".to_string(), String::new()];
    assert!(config.validate().is_err());

    config.bot.prefixes = vec!["!".to_string(), "!".to_string()];
    assert!(config.validate().is_err());
}

#[test]
fn test_parse_full_config() {
    let config = ConfigLoader::parse(config_fixtures::full_config_toml()).unwrap();

    assert_eq!(config.bot.nick, "testbot");
    assert_eq!(config.bot.prefixes, vec!["!".to_string(), "?".to_string()]);
    assert!(config.bot.case_insensitive);
    assert_eq!(config.bot.initial_channels[1], ChannelName::new("otherchannel"));
    assert_eq!(config.modules.enabled.len(), 2);
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_then_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tchat.toml");
    std::fs::write(&path, config_fixtures::minimal_config_toml()).unwrap();

    let loader = ConfigLoader::new(&path);
    let mut config = loader.load().unwrap();
    assert_eq!(config.bot.token, "oauth:test_token");

    config.bot.owners.push("someowner".to_string());
    loader.save(&config).unwrap();

    let reloaded = ConfigLoader::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded.bot.owners, vec!["someowner".to_string()]);
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::new(dir.path().join("absent.toml"));
    assert!(loader.load().is_err());
}

#[test]
fn test_config_cache() {
    let cache = ConfigCache::new(Config::default());
    assert_eq!(cache.bot().prefixes, vec!["!".to_string()]);

    cache.modify(|config| config.bot.prefixes.push("?".to_string()));
    assert_eq!(cache.get().bot.prefixes.len(), 2);

    let mut replacement = Config::default();
    replacement.bot.nick = "replaced".to_string();
    cache.update(replacement);
    assert_eq!(cache.bot().nick, "replaced");
}
