//! Small, widely used helpers that don't belong to any one subsystem.

pub mod consts;
pub mod prelude;

/// Extension trait for types that resolve to a twilight snowflake id.
pub trait IdExt<M> {
    fn id(&self) -> twilight_model::id::Id<M>;
}

impl IdExt<twilight_model::id::marker::UserMarker> for twilight_model::user::User {
    fn id(&self) -> twilight_model::id::Id<twilight_model::id::marker::UserMarker> {
        self.id
    }
}

impl IdExt<twilight_model::id::marker::ChannelMarker> for twilight_model::channel::Channel {
    fn id(&self) -> twilight_model::id::Id<twilight_model::id::marker::ChannelMarker> {
        self.id
    }
}

impl IdExt<twilight_model::id::marker::RoleMarker> for twilight_model::guild::Role {
    fn id(&self) -> twilight_model::id::Id<twilight_model::id::marker::RoleMarker> {
        self.id
    }
}

impl IdExt<twilight_model::id::marker::MessageMarker> for twilight_model::channel::Message {
    fn id(&self) -> twilight_model::id::Id<twilight_model::id::marker::MessageMarker> {
        self.id
    }
}

/// Escape characters that would otherwise trigger Discord markdown or mentions.
pub fn escape_discord_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '~' | '`' | '|' | '\\' | '@') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Format a list of items as a human readable, comma separated string.
pub fn nice_list<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Helper macro to implement accessors that unwrap a single enum variant,
/// returning `None` for every other variant.
macro_rules! impl_variant_option {
    (
        $(
            $vis:vis fn $method:ident(&$self:ident: $variant:ident ($val:ident)) -> $ret:ty $( { $expr:expr } )?
        );* $(;)?
    ) => {
        $(
            $vis fn $method(&$self) -> Option<$ret> {
                match $self {
                    Self::$variant($val) => Some(impl_variant_option!(@body $val $( $expr )?)),
                    _ => None,
                }
            }
        )*
    };
    (@body $val:ident) => { $val };
    (@body $val:ident $expr:expr) => { $expr };
}

pub(crate) use impl_variant_option;
