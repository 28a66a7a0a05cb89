use crate::components::block::BlockDefinition;

const TYPE_PREFIX: &str = "MyObjectBuilder_";

/// True when any entry of the block list names this block definition.
///
/// An entry may be the type id (with or without the builder prefix), the
/// subtype id, the pair name, or `Type/Subtype`. Comparison ignores case.
pub fn is_match(definition: &BlockDefinition, block_list: &[String]) -> bool {
    block_list
        .iter()
        .any(|entry| entry_matches(entry.trim(), definition))
}

fn entry_matches(entry: &str, definition: &BlockDefinition) -> bool {
    if entry.is_empty() {
        return false;
    }

    let type_id = strip_type_prefix(&definition.type_id);
    if let Some((type_part, subtype_part)) = entry.split_once('/') {
        return strip_type_prefix(type_part).eq_ignore_ascii_case(type_id)
            && subtype_part.eq_ignore_ascii_case(&definition.subtype_id);
    }

    strip_type_prefix(entry).eq_ignore_ascii_case(type_id)
        || entry.eq_ignore_ascii_case(&definition.subtype_id)
        || entry.eq_ignore_ascii_case(&definition.pair_name)
}

fn strip_type_prefix(type_id: &str) -> &str {
    type_id.strip_prefix(TYPE_PREFIX).unwrap_or(type_id)
}
