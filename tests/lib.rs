//! Integration tests spanning the entity, migration and HR crates live next to this file.
