//! Collection aliases switched by the `performance` features.

#[cfg(feature = "ahash")]
pub(crate) type Map<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

#[cfg(feature = "smallvec")]
pub(crate) type ListenerVec<T> = smallvec::SmallVec<[T; 4]>;
#[cfg(not(feature = "smallvec"))]
pub(crate) type ListenerVec<T> = Vec<T>;
