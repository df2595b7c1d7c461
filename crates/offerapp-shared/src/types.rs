use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(PostId);
uuid_id!(CommentId);

// ---------------------------------------------------------------------------
// Post status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PostStatus {
    #[serde(rename = "activa")]
    Active,
    #[serde(rename = "vencida")]
    Expired,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "activa",
            PostStatus::Expired => "vencida",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activa" => Ok(PostStatus::Active),
            "vencida" => Ok(PostStatus::Expired),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Vote value
// ---------------------------------------------------------------------------

/// A single user's signal on a post. Absence of a vote counts as zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(v: VoteValue) -> i8 {
        v.as_i64() as i8
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = ValidationError;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        Self::try_from(v as i64)
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = ValidationError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(ValidationError::InvalidVoteValue(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Post category. `All` only exists as a feed filter; posts never carry it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "Todos")]
    All,
    #[serde(rename = "Alimentos")]
    Food,
    #[serde(rename = "Tecnología")]
    Technology,
    #[serde(rename = "Moda")]
    Fashion,
    #[serde(rename = "Deportes")]
    Sports,
    #[serde(rename = "Construcción")]
    Construction,
    #[serde(rename = "Animales")]
    Animals,
    #[serde(rename = "Electrodomésticos")]
    Appliances,
    #[serde(rename = "Servicios")]
    Services,
    #[serde(rename = "Educación")]
    Education,
    #[serde(rename = "Juguetes")]
    Toys,
    #[serde(rename = "Vehículos")]
    Vehicles,
    #[serde(rename = "Otros")]
    Other,
}

impl Category {
    /// Every category in menu order, `All` first.
    pub const ALL: [Category; 13] = [
        Category::All,
        Category::Food,
        Category::Technology,
        Category::Fashion,
        Category::Sports,
        Category::Construction,
        Category::Animals,
        Category::Appliances,
        Category::Services,
        Category::Education,
        Category::Toys,
        Category::Vehicles,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "Todos",
            Category::Food => "Alimentos",
            Category::Technology => "Tecnología",
            Category::Fashion => "Moda",
            Category::Sports => "Deportes",
            Category::Construction => "Construcción",
            Category::Animals => "Animales",
            Category::Appliances => "Electrodomésticos",
            Category::Services => "Servicios",
            Category::Education => "Educación",
            Category::Toys => "Juguetes",
            Category::Vehicles => "Vehículos",
            Category::Other => "Otros",
        }
    }

    /// Categories a post can be filed under.
    pub fn postable() -> impl Iterator<Item = Category> {
        Self::ALL.into_iter().filter(|c| *c != Category::All)
    }

    /// `All` matches everything, any other category only itself.
    pub fn matches(&self, post_category: Category) -> bool {
        *self == Category::All || *self == post_category
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Feed options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Score,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Newest => "Fecha (más recientes)",
            SortOption::PriceAsc => "Precio (menor a mayor)",
            SortOption::PriceDesc => "Precio (mayor a menor)",
            SortOption::Score => "Puntaje",
        }
    }
}

/// Server-side status filter ("Todas" / "Activa" / "Vencida").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Any,
    Only(PostStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: PostStatus) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedTab {
    #[default]
    All,
    Following,
}

/// Everything the backend needs to build a feed page query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeedQuery {
    pub category: Category,
    pub status: StatusFilter,
    pub sort: SortOption,
}

impl Default for Category {
    fn default() -> Self {
        Category::All
    }
}

/// Opaque pagination cursor handed out by the backend with each page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
