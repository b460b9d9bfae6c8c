/// Result of classifying a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Not forwarded anywhere.
    Drop,
    /// Delivered to pipes 0 and 1 only, at priority 0.
    Local,
    /// Delivered to every output pipe, at the computed priority.
    All,
}
