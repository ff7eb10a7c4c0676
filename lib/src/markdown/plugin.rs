use pulldown_cmark::Event;

/// A pass over the event stream of a Markdown document.
pub trait Plugin {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a;
}
