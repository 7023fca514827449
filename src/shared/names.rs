use rand::Rng;

pub const MAX_PLAYER_NAME_BYTES: usize = 24;

/// Bot name pool, tagged on pick so bots are recognizable on the leaderboard.
pub const BOT_NAMES: &[&str] = &[
    "Bumba", "nick26", "jjjjj", "Rigor", "meow", "cookie", "HAHA", "Meep", "paige", "tico",
    "Donald", "Wander", "Wormy", "Loser", "Miguel", "MAZORCA", "Otto the Otter", "Zombies32",
    "nom nom", "yum yum", "hi", "cuty", "mota", "MasterLeo", "ike", "Kyle", "YOLO",
    "ooooooh noo", "brynna", "ROOMBA", "Jay", "Christina", "fire", "lizabot", "Nub",
    "the master", "missdee", "Fuscao", "ouchie", "poma", "Said", "seek", "livia", "lol",
    "ant", "brett", "DOOM", "MustachioMan", "Layla", "anaconda", "gdf", "daplug", "fart",
    "HELLO", "master ov", "dangerous woman", "Kunshiwa", "tootie", "Jillian", "Peeps",
    "gage", "abel", "savage", "bob", "GOKU", "Quicksnake", "tee", "you", "Mister Snake",
    "tinySATAN", "maggie", "Jareds Box", "McDillius", "bubble buns", "mole", "Pope",
    "Zam", "Chameleon", "hero", "Alien",
];

pub fn random_bot_name(rng: &mut impl Rng) -> String {
    let index = rng.gen_range(0..BOT_NAMES.len());
    format!("{} (Bot)", BOT_NAMES[index])
}

/// Collapses whitespace and truncates to 24 bytes on a char boundary.
pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    let mut end = cleaned.len().min(MAX_PLAYER_NAME_BYTES);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_string()
}
