//! services/channel_matcher.rs
//! Comparación flexible de nombres de canal.
//!
//! Los servidores suelen decorar los nombres con emojis o prefijos
//! ("🔥live-alerts", "📈┃himothy-trades"), así que además de la igualdad
//! exacta se compara la forma "canonizada" y se acepta contención.
//! La comparación distingue mayúsculas de minúsculas: no se hace case-folding.
//!
//! Ojo: un identificador vacío coincide con todo (contención de ""). Quien
//! llama debe tratar un identificador vacío como "no configurado".

use once_cell::sync::Lazy;
use regex::Regex;

// Igual que `[^\w-]` en ASCII: cualquier cosa que no sea letra, dígito, '_' o '-'.
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("regex inválida"));

/// Quita todo lo que no sea carácter de palabra o guion, y luego los guiones iniciales.
pub fn canonicalize(name: &str) -> String {
    NON_WORD
        .replace_all(name, "")
        .trim_start_matches('-')
        .to_string()
}

/// Decide si `observed` corresponde al identificador configurado.
/// Primera regla verdadera gana:
/// 1. igualdad exacta
/// 2. igualdad de formas canonizadas
/// 3. `observed` contiene el identificador (sin tocar)
/// 4. la forma canonizada de `observed` contiene la del identificador
pub fn matches(observed: &str, configured: &str) -> bool {
    if observed == configured {
        return true;
    }
    let observed_canon = canonicalize(observed);
    let configured_canon = canonicalize(configured);
    if observed_canon == configured_canon {
        return true;
    }
    if observed.contains(configured) {
        return true;
    }
    observed_canon.contains(&configured_canon)
}
