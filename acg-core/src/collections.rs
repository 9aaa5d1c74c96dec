pub mod hashmap {
    pub type HashMap<K, V> = hashbrown::HashMap<K, V>;
    pub use hashbrown::hash_map::*;
}

pub mod hashset {
    pub type HashSet<T> = hashbrown::HashSet<T>;
    pub use hashbrown::hash_set::*;
}
