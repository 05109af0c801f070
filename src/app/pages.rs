//! The static navigation shell. Pure routing: none of these pages touch the
//! loaded data.

use iced::widget::{text, Column};
use iced::Element;

use crate::app::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Home,
    Chatbot,
    About,
    Terms,
    Privacy,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Dashboard,
        Page::Home,
        Page::Chatbot,
        Page::About,
        Page::Terms,
        Page::Privacy,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Home => "Home",
            Page::Chatbot => "Chatbot",
            Page::About => "About",
            Page::Terms => "Terms and Conditions",
            Page::Privacy => "Privacy Policy",
        }
    }
}

/// Render one of the informational pages. The dashboard itself is built in
/// `app::view`, not here.
pub fn view(page: Page) -> Element<'static, Message> {
    let body: &'static str = match page {
        Page::Home => {
            "Welcome to tabscout. Load a CSV file or connect a spreadsheet on the \
             Dashboard page, pick an entity column, and run a templated lookup \
             enriched with web search snippets."
        }
        Page::Chatbot => "The chatbot is not available in this build.",
        Page::About => {
            "tabscout is a small information-retrieval dashboard. It correlates \
             rows of a table with web search results and exports the combined \
             records as CSV."
        }
        Page::Terms => {
            "Use of the remote spreadsheet and search services is subject to the \
             terms of those services. Data you load stays on this machine apart \
             from the queries sent to them."
        }
        Page::Privacy => {
            "Your API key and authorization credential are stored locally and \
             sent only to their respective services. No loaded data leaves this \
             machine except as search query text."
        }
        Page::Dashboard => "",
    };

    Column::new()
        .push(text(page.title()).size(28))
        .push(text(body))
        .spacing(16)
        .padding(24)
        .into()
}
