/// Lookup and mutation helpers shared by the name-keyed configuration
/// collections.
macro_rules! impl_named_collection {
    ($collection:ident, $item:ident, $kind:expr) => {
        impl $collection {
            pub fn new() -> $collection {
                $collection(vec![])
            }

            pub fn by_name(&self, name: &str) -> Result<&$item, $crate::ConfigError> {
                self.0
                    .iter()
                    .find(|item| item.name == name)
                    .ok_or_else(|| $crate::ConfigError::NotFound {
                        kind: $kind,
                        name: name.to_string(),
                    })
            }

            pub fn by_name_mut(&mut self, name: &str) -> Result<&mut $item, $crate::ConfigError> {
                self.0
                    .iter_mut()
                    .find(|item| item.name == name)
                    .ok_or_else(|| $crate::ConfigError::NotFound {
                        kind: $kind,
                        name: name.to_string(),
                    })
            }

            /// Replaces the entry sharing the same name, or appends.
            pub fn add_or_update(&mut self, item: $item) {
                match self.0.iter_mut().find(|existing| existing.name == item.name) {
                    Some(existing) => *existing = item,
                    None => self.0.push(item),
                }
            }

            pub fn remove(&mut self, name: &str) -> Result<(), $crate::ConfigError> {
                let before = self.0.len();
                self.0.retain(|item| item.name != name);
                if self.0.len() == before {
                    return Err($crate::ConfigError::NotFound {
                        kind: $kind,
                        name: name.to_string(),
                    });
                }
                Ok(())
            }

            pub fn names(&self) -> Vec<String> {
                self.0.iter().map(|item| item.name.clone()).collect()
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.0.iter()
            }

            pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, $item> {
                self.0.iter_mut()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl<'a> IntoIterator for &'a $collection {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }

        impl From<Vec<$item>> for $collection {
            fn from(items: Vec<$item>) -> Self {
                $collection(items)
            }
        }
    };
}
