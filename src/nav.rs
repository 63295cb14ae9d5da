//! Page selection
//!
//! The active page is a plain value carried by each request. Moving between
//! pages is the pure function [`transition`]; nothing is remembered between
//! renders except what the request says.

use serde::Serialize;

/// The five sections of the dashboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Page {
    #[default]
    Home,
    About,
    Explore,
    Insights,
    Contact,
}

impl Page {
    /// Sidebar order
    pub const ALL: [Page; 5] = [
        Page::Home,
        Page::About,
        Page::Explore,
        Page::Insights,
        Page::Contact,
    ];

    /// Title shown in the browser tab and sidebar
    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::About => "About",
            Page::Explore => "Explore",
            Page::Insights => "Insights",
            Page::Contact => "Contact",
        }
    }

    /// Lower-case identifier used in URLs
    pub fn slug(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::About => "about",
            Page::Explore => "explore",
            Page::Insights => "insights",
            Page::Contact => "contact",
        }
    }

    /// Case-insensitive lookup by slug or title
    pub fn parse(name: &str) -> Option<Page> {
        let name = name.trim();
        Page::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(name))
    }

    /// Link that renders this page directly
    pub fn href(self) -> String {
        format!("/?page={}", self.slug())
    }
}

/// Where a navigation request came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavEvent {
    /// The sidebar section selector
    Sidebar(Page),
    /// A call-to-action button on Home
    HomeButton(Page),
}

impl NavEvent {
    /// Build an event from the `nav` / `via` query pair
    ///
    /// `via` defaults to the sidebar. Unknown targets or sources give `None`.
    pub fn from_query(nav: &str, via: Option<&str>) -> Option<NavEvent> {
        let target = Page::parse(nav)?;
        match via.map(str::trim) {
            None | Some("") | Some("sidebar") => Some(NavEvent::Sidebar(target)),
            Some("button") => Some(NavEvent::HomeButton(target)),
            Some(_) => None,
        }
    }
}

/// Pages reachable through the buttons on Home
pub const HOME_BUTTONS: [Page; 2] = [Page::Explore, Page::Insights];

/// Next page for an event
///
/// The sidebar can reach any page from anywhere. Home buttons only act on
/// Home and only for [`HOME_BUTTONS`] targets; otherwise the page stays put.
pub fn transition(current: Page, event: NavEvent) -> Page {
    match event {
        NavEvent::Sidebar(target) => target,
        NavEvent::HomeButton(target) if current == Page::Home && HOME_BUTTONS.contains(&target) => {
            target
        }
        NavEvent::HomeButton(_) => current,
    }
}

/// Top-level Explore topic
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Topic {
    #[default]
    Defense,
    Aid,
}

/// Sub-topic under [`Topic`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SubTopic {
    DefenseSpending,
    ArmsTrade,
    OtherDefenseIndicators,
    TopDonorsRecipients,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Defense, Topic::Aid];

    /// Display label, also the `topic` query value
    pub fn label(self) -> &'static str {
        match self {
            Topic::Defense => "Defense",
            Topic::Aid => "Aid",
        }
    }

    pub fn parse(label: &str) -> Option<Topic> {
        Topic::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label.trim()))
    }

    /// Sub-topics offered for this topic, first is the default
    pub fn sub_topics(self) -> &'static [SubTopic] {
        match self {
            Topic::Defense => &[
                SubTopic::DefenseSpending,
                SubTopic::ArmsTrade,
                SubTopic::OtherDefenseIndicators,
            ],
            Topic::Aid => &[SubTopic::TopDonorsRecipients],
        }
    }
}

impl SubTopic {
    /// Display label, also the `sub` query value
    pub fn label(self) -> &'static str {
        match self {
            SubTopic::DefenseSpending => "Defense Spending",
            SubTopic::ArmsTrade => "Arms Trade",
            SubTopic::OtherDefenseIndicators => "Other Defense Indicators",
            SubTopic::TopDonorsRecipients => "Top Donors & Recipients",
        }
    }
}

/// The topic pair chosen on Explore
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ExploreSelection {
    pub topic: Topic,
    pub sub: SubTopic,
}

impl ExploreSelection {
    /// Resolve the selectors, falling back to defaults
    ///
    /// A sub-topic that does not belong to the chosen topic (e.g. after the
    /// topic selector changed) snaps to that topic's first sub-topic.
    pub fn resolve(topic: Option<&str>, sub: Option<&str>) -> Self {
        let topic = topic.and_then(Topic::parse).unwrap_or_default();
        let choices = topic.sub_topics();
        let sub = sub
            .and_then(|s| {
                choices
                    .iter()
                    .copied()
                    .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            })
            .unwrap_or(choices[0]);
        ExploreSelection { topic, sub }
    }
}

impl Default for ExploreSelection {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}
