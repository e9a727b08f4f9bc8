//! Rendering of the welcome comment.
//!
//! The long variant (with committers) is chosen exactly when the committer
//! list is non-empty.

use crate::{Contacts, Login, LoginSet, Role, SigName};

const MENTION_SEPARATOR: &str = " , @";

/// Everything the welcome template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeContext<'a> {
    pub author: &'a Login,
    pub sig: &'a SigName,
    pub contacts: &'a Contacts,
    /// Community display name, e.g. `"openEuler"`.
    pub community_name: &'a str,
    /// Link to the bot command help page.
    pub command_link: &'a str,
    /// Base URL of the SIG directory pages; the SIG name is appended.
    pub sig_link_base: &'a str,
}

/// Which template a context renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    MaintainersOnly,
    WithCommitters,
}

impl WelcomeContext<'_> {
    pub fn variant(&self) -> TemplateVariant {
        if self.contacts.committers.is_empty() {
            TemplateVariant::MaintainersOnly
        } else {
            TemplateVariant::WithCommitters
        }
    }
}

/// Renders the welcome comment for `ctx`.
pub fn compose_welcome(ctx: &WelcomeContext<'_>) -> String {
    let sig_link = format!("{}/{}", ctx.sig_link_base.trim_end_matches('/'), ctx.sig);
    let mut text = format!(
        "\nHi ***{author}***, welcome to the {community} Community.\n\
         I'm the Bot here serving you. You can find the instructions on how to interact with me at **[Here]({link})**.\n\
         If you have any questions, please contact the SIG: [{sig}]({sig_link}), and any of the maintainers: @{maintainers}",
        author = ctx.author,
        community = ctx.community_name,
        link = ctx.command_link,
        sig = ctx.sig,
        sig_link = sig_link,
        maintainers = mentions(ctx.contacts.by_role(Role::Maintainer)),
    );

    if ctx.variant() == TemplateVariant::WithCommitters {
        text.push_str(", any of the committers: @");
        text.push_str(&mentions(ctx.contacts.by_role(Role::Committer)));
    }
    text
}

fn mentions(logins: &LoginSet) -> String {
    logins
        .iter()
        .map(Login::as_str)
        .collect::<Vec<_>>()
        .join(MENTION_SEPARATOR)
}
