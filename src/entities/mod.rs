//! The document model: Document → Timeline → Layer → Frame → Element,
//! plus the Library of reusable Items.

pub mod document;
pub mod element;
pub mod frame;
pub mod item;
pub mod layer;
pub mod library;
pub mod timeline;
pub mod transform;

pub use document::Document;
pub use element::{
    BitmapInstance, BlendMode, Element, Group, LoopMode, Shape, SymbolInstance, SymbolType, Text,
    TextAlign,
};
pub use frame::{Ease, Frame, LabelType, SoundSync, TweenType};
pub use item::{Item, ItemData};
pub use layer::{Layer, LayerType};
pub use library::{EventDelivery, ItemOperation, Library};
pub use timeline::Timeline;
pub use transform::{Matrix, Point};

/// Closed string domain as an enum: `as_str`/`Display` give the persisted
/// spelling, `FromStr` rejects anything outside the domain with a
/// Validation error. Mark the default variant with `#[default]`.
macro_rules! xfl_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::XflError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(crate::error::XflError::validation(format!(
                        "'{}' is not a valid {}",
                        other,
                        stringify!($name),
                    ))),
                }
            }
        }
    };
}
pub(crate) use xfl_enum;
