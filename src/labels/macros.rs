//! Macros for declaring label tags.

/// Declare `const` label tags under the `StateMachine.Label` root, or under
/// another root given as `root = "...";`.
///
/// ```rust
/// use stackmind::label_tags;
///
/// label_tags! {
///     pub const PATROL = "Patrol";
///     const ALERT = "Alert.Search";
/// }
///
/// label_tags! {
///     root = "Npc.Label";
///     const FORAGE = "Forage";
/// }
///
/// assert_eq!(PATROL.as_str(), "StateMachine.Label.Patrol");
/// assert!(ALERT.is_label());
/// assert_eq!(FORAGE.as_str(), "Npc.Label.Forage");
/// ```
#[macro_export]
macro_rules! label_tags {
    (
        root = $root:literal;
        $(
            $(#[$meta:meta])*
            $vis:vis const $name:ident = $leaf:literal;
        )*
    ) => {
        $(
            $(#[$meta])*
            $vis const $name: $crate::labels::LabelTag =
                $crate::labels::LabelTag::from_static(concat!($root, ".", $leaf));
        )*
    };
    (
        $(
            $(#[$meta:meta])*
            $vis:vis const $name:ident = $leaf:literal;
        )*
    ) => {
        $crate::label_tags! {
            root = "StateMachine.Label";
            $(
                $(#[$meta])*
                $vis const $name = $leaf;
            )*
        }
    };
}
