/// The view of a parsed document element that the directive interpreter needs.
///
/// Implemented by [`Element`](super::xml::Element); the loader never touches
/// the XML library directly.
pub trait SettingsNode: Sized {
    fn name(&self) -> &str;

    fn attribute(&self, name: &str) -> Option<&str>;

    /// Immediate child elements in document order.
    fn children(&self) -> &[Self];
}

/// Walks a `/`-separated element path starting at `root`.
///
/// The first segment must name the root itself; each following segment
/// descends into the first child element with that name. A leading `/` is
/// accepted, so `/configuration/appSettings` and `configuration/appSettings`
/// are equivalent.
pub fn select<'a, N: SettingsNode>(root: &'a N, selector: &str) -> Option<&'a N> {
    let mut segments = selector.split('/').filter(|s| !s.is_empty());

    let first = segments.next()?;
    if root.name() != first {
        return None;
    }

    let mut current = root;
    for segment in segments {
        current = current.children().iter().find(|c| c.name() == segment)?;
    }

    Some(current)
}
