// src/commands/registry.rs
use std::collections::HashMap;
use super::types::Command;

pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry of host-installed external commands (C8's third
/// dispatch tier, after functions and built-ins). `network_enabled`
/// gates capability-restricted commands such as `curl` -- when false
/// they are left out of the registry entirely, so lookup falls through
/// to PATH resolution and ultimately *command not found*, matching the
/// "a command registered under a policy-gated capability is only
/// visible when the capability is enabled" contract.
pub fn build_registry(network_enabled: bool) -> CommandRegistry {
    let mut reg = CommandRegistry::new();

    reg.register(Box::new(crate::commands::alias_cmd::AliasCommand));
    reg.register(Box::new(crate::commands::awk::AwkCommand));
    reg.register(Box::new(crate::commands::base64_cmd::Base64Command));
    reg.register(Box::new(crate::commands::basename::BasenameCommand));
    reg.register(Box::new(crate::commands::bash_cmd::BashCommand));
    reg.register(Box::new(crate::commands::bash_cmd::ShCommand));
    reg.register(Box::new(crate::commands::cat::CatCommand));
    reg.register(Box::new(crate::commands::chmod::ChmodCommand));
    reg.register(Box::new(crate::commands::clear_cmd::ClearCommand));
    reg.register(Box::new(crate::commands::cp::CpCommand));
    reg.register(Box::new(crate::commands::cut::CutCommand));
    reg.register(Box::new(crate::commands::date::DateCommand));
    reg.register(Box::new(crate::commands::dirname::DirnameCommand));
    reg.register(Box::new(crate::commands::du_cmd::DuCommand));
    reg.register(Box::new(crate::commands::echo::EchoCommand));
    reg.register(Box::new(crate::commands::env::EnvCommand));
    reg.register(Box::new(crate::commands::env::PrintenvCommand));
    reg.register(Box::new(crate::commands::expand_cmd::ExpandCommand));
    reg.register(Box::new(crate::commands::expr_cmd::ExprCommand));
    reg.register(Box::new(crate::commands::file_cmd::FileCommand));
    reg.register(Box::new(crate::commands::find::FindCommand));
    reg.register(Box::new(crate::commands::fold_cmd::FoldCommand));
    reg.register(Box::new(crate::commands::grep::GrepCommand));
    reg.register(Box::new(crate::commands::gzip::GzipCommand));
    reg.register(Box::new(crate::commands::gzip::GunzipCommand));
    reg.register(Box::new(crate::commands::gzip::ZcatCommand));
    reg.register(Box::new(crate::commands::head::HeadCommand));
    reg.register(Box::new(crate::commands::help_cmd::HelpCommand));
    reg.register(Box::new(crate::commands::hostname_cmd::HostnameCommand));
    reg.register(Box::new(crate::commands::join::JoinCommand));
    reg.register(Box::new(crate::commands::ln::LnCommand));
    reg.register(Box::new(crate::commands::ls::LsCommand));
    reg.register(Box::new(crate::commands::md5sum::Md5sumCommand));
    reg.register(Box::new(crate::commands::md5sum::Sha1sumCommand));
    reg.register(Box::new(crate::commands::md5sum::Sha256sumCommand));
    reg.register(Box::new(crate::commands::mkdir::MkdirCommand));
    reg.register(Box::new(crate::commands::mv::MvCommand));
    reg.register(Box::new(crate::commands::nl::NlCommand));
    reg.register(Box::new(crate::commands::od_cmd::OdCommand));
    reg.register(Box::new(crate::commands::paste::PasteCommand));
    reg.register(Box::new(crate::commands::printf::PrintfCommand));
    reg.register(Box::new(crate::commands::pwd::PwdCommand));
    reg.register(Box::new(crate::commands::readlink_cmd::ReadlinkCommand));
    reg.register(Box::new(crate::commands::rev_cmd::RevCommand));
    reg.register(Box::new(crate::commands::rm::RmCommand));
    reg.register(Box::new(crate::commands::rmdir_cmd::RmdirCommand));
    reg.register(Box::new(crate::commands::sed::SedCommand));
    reg.register(Box::new(crate::commands::seq::SeqCommand));
    reg.register(Box::new(crate::commands::sleep_cmd::SleepCommand));
    reg.register(Box::new(crate::commands::sort::SortCommand));
    reg.register(Box::new(crate::commands::split_cmd::SplitCommand));
    reg.register(Box::new(crate::commands::stat_cmd::StatCommand));
    reg.register(Box::new(crate::commands::strings_cmd::StringsCommand));
    reg.register(Box::new(crate::commands::tac_cmd::TacCommand));
    reg.register(Box::new(crate::commands::tail::TailCommand));
    reg.register(Box::new(crate::commands::tar::TarCommand));
    reg.register(Box::new(crate::commands::tee::TeeCommand));
    reg.register(Box::new(crate::commands::test_cmd::TestCommand));
    reg.register(Box::new(crate::commands::test_cmd::BracketCommand));
    reg.register(Box::new(crate::commands::time_cmd::TimeCommand));
    reg.register(Box::new(crate::commands::timeout_cmd::TimeoutCommand));
    reg.register(Box::new(crate::commands::touch::TouchCommand));
    reg.register(Box::new(crate::commands::tr::TrCommand));
    reg.register(Box::new(crate::commands::tree_cmd::TreeCommand));
    reg.register(Box::new(crate::commands::true_cmd::TrueCommand));
    reg.register(Box::new(crate::commands::true_cmd::FalseCommand));
    reg.register(Box::new(crate::commands::unalias_cmd::UnaliasCommand));
    reg.register(Box::new(crate::commands::uniq::UniqCommand));
    reg.register(Box::new(crate::commands::wc::WcCommand));
    reg.register(Box::new(crate::commands::which_cmd::WhichCommand));
    reg.register(Box::new(crate::commands::whoami_cmd::WhoamiCommand));
    reg.register(Box::new(crate::commands::xargs::XargsCommand));

    if network_enabled {
        reg.register(Box::new(crate::commands::curl::CurlCommand));
    }

    reg
}
