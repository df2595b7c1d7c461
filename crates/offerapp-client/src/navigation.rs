//! Screen routes.

use std::fmt;
use std::str::FromStr;

use offerapp_shared::{PostId, UserId};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Register,
    ForgotPassword,
    Main,
    CreatePost,
    PostDetail(PostId),
    Map,
    Profile(UserId),
    /// The signed-in user's own profile.
    MyProfile,
}

impl Screen {
    pub fn route(&self) -> String {
        match self {
            Screen::Login => "login".into(),
            Screen::Register => "register".into(),
            Screen::ForgotPassword => "forgot_password".into(),
            Screen::Main => "main".into(),
            Screen::CreatePost => "create_post".into(),
            Screen::PostDetail(id) => format!("post_detail/{id}"),
            Screen::Map => "map".into(),
            Screen::Profile(uid) => format!("profile/{uid}"),
            Screen::MyProfile => "my-profile".into(),
        }
    }

    /// Screens reachable without a signed-in user.
    pub fn is_public(&self) -> bool {
        matches!(self, Screen::Login | Screen::Register | Screen::ForgotPassword)
    }
}

/// Where the app opens, given the persisted logged-in flag.
pub fn start_destination(is_logged_in: bool) -> Screen {
    if is_logged_in {
        Screen::Main
    } else {
        Screen::Login
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.route())
    }
}

impl FromStr for Screen {
    type Err = ClientError;

    fn from_str(route: &str) -> Result<Self, Self::Err> {
        let unknown = || ClientError::UnknownRoute(route.to_string());
        let screen = match route {
            "login" => Screen::Login,
            "register" => Screen::Register,
            "forgot_password" => Screen::ForgotPassword,
            "main" => Screen::Main,
            "create_post" => Screen::CreatePost,
            "map" => Screen::Map,
            "my-profile" => Screen::MyProfile,
            _ => match route.split_once('/') {
                Some(("post_detail", id)) => {
                    Screen::PostDetail(PostId::parse(id).map_err(|_| unknown())?)
                }
                Some(("profile", id)) => Screen::Profile(UserId::parse(id).map_err(|_| unknown())?),
                _ => return Err(unknown()),
            },
        };
        Ok(screen)
    }
}
