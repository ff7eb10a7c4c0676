use std::collections::VecDeque;

use pulldown_cmark::{Event, Tag, TagEnd};
use rustc_hash::FxHashMap;

use super::Plugin;

/// Gives every heading without an explicit `{#id}` a slug of its text as id.
/// Repeated slugs get a `-1`, `-2`, ... suffix.
#[derive(Debug, Default)]
pub struct AutoHeading {
    seen: FxHashMap<String, usize>,
}

struct HeadingIterator<'p, 'a, I: Iterator<Item = Event<'a>>> {
    stack: VecDeque<Event<'a>>,
    seen: &'p mut FxHashMap<String, usize>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIterator<'_, 'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.stack.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading { level, id: None, classes, attrs }) => {
                let mut text = String::new();
                loop {
                    let event = self.inner.next()?;
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    } else if let Event::End(TagEnd::Heading(..)) = event {
                        break;
                    }

                    self.stack.push_back(event);
                }

                let slug = crate::util::slugify(&text);
                let id = match self.seen.get_mut(&slug) {
                    Some(n) => {
                        *n += 1;
                        format!("{slug}-{n}")
                    }
                    None => {
                        self.seen.insert(slug.clone(), 0);
                        slug
                    }
                };

                let tag = Tag::Heading { level, id: Some(id.into()), classes, attrs };
                self.stack.push_back(Event::End(TagEnd::Heading(level)));
                Some(Event::Start(tag))
            },
            event => Some(event)
        }
    }
}

impl Plugin for AutoHeading {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        HeadingIterator {
            seen: &mut self.seen,
            inner: events,
            stack: VecDeque::with_capacity(4),
        }
    }
}
