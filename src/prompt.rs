use once_cell::sync::Lazy;
use serde::Serialize;

pub const IDENTITY_DIRECTIVE: &str = "1. **Analyse the reference images:** Identify the CORE IDENTITY FEATURES of the character(s) (face, hairstyle, eye color, build). These features MUST be preserved exactly.";

pub const SCENARIO_DIRECTIVE: &str = "2. **Carry out the prompt:** Place the identified character(s) in the completely new scenario described in the \"User prompt\".";

pub const ATTIRE_DIRECTIVE: &str = "3. **ABOUT CLOTHING:** NEVER copy the outfit, clothes or accessories from the reference images. Instead, you MUST dress the character in NEW attire based on the \"User prompt\". If the prompt does not describe an outfit, invent one that fits the scenario.";

pub const POSE_DIRECTIVE: &str = "4. **ABOUT ACTION AND POSE:** The character's action and pose (stance, position of arms and legs) MUST be decided ENTIRELY by the \"User prompt\". **NEVER** copy or be influenced by the pose in the reference images. Replace it with the new action.";

pub const CONTEXT_DIRECTIVE: &str = "**Background requirement:** Keep the background from the provided context image unchanged. Only change the character(s) and character-related elements according to the prompt.";

pub const CORE_DIRECTIVES: [&str; 4] = [
    IDENTITY_DIRECTIVE,
    SCENARIO_DIRECTIVE,
    ATTIRE_DIRECTIVE,
    POSE_DIRECTIVE,
];

pub fn compose_prompt(user_prompt: &str, use_context: bool) -> String {
    let mut out = format!("User prompt: \"{user_prompt}\".\n\n**Your task:**\n");
    for directive in CORE_DIRECTIVES {
        out.push_str(directive);
        out.push('\n');
    }
    out.push('\n');
    if use_context {
        out.push_str(CONTEXT_DIRECTIVE);
        out.push_str("\n\n");
    }
    out
}

pub fn append_fragment(prompt: &str, fragment: &str) -> String {
    if prompt.is_empty() {
        fragment.to_string()
    } else {
        format!("{prompt}, {fragment}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionCategory {
    pub name: &'static str,
    pub suggestions: &'static [&'static str],
}

static CATALOG: Lazy<Vec<SuggestionCategory>> = Lazy::new(|| {
    vec![
        SuggestionCategory {
            name: "Action",
            suggestions: &[
                "sprinting", "dancing gracefully", "meditating", "reading an old book",
                "painting a picture", "fighting", "exploring a cave", "singing on stage",
                "riding a dragon", "surfing", "brewing a potion", "repairing a robot",
                "playing electric guitar", "skydiving", "piloting a spaceship",
                "a spy hiding in the shadows",
            ],
        },
        SuggestionCategory {
            name: "Expression",
            suggestions: &[
                "beaming smile", "pensive look", "determined gaze", "utterly surprised",
                "crying in the rain", "playful wink", "shouting in anger", "mysterious smirk",
                "arrogant expression", "curious eyes", "deep sadness", "sly expression",
                "confused", "nostalgic", "laughing at a movie", "mischievous glint",
                "enigmatic smile", "serious while solving a puzzle",
                "tender gaze into the distance",
            ],
        },
        SuggestionCategory {
            name: "Outfit",
            suggestions: &[
                "wearing knight armor", "wearing an evening gown", "astronaut suit",
                "leather jacket and jeans", "traditional kimono", "wizard robe",
                "steampunk outfit", "swimwear", "school uniform", "royal attire",
                "explorer gear", "futuristic outfit", "hoodie and headphones",
                "shadow ninja outfit", "sharp business suit", "caribbean pirate outfit",
                "modern ao dai", "sporty tracksuit", "boho-chic dress",
                "neon cyberpunk outfit", "post-apocalyptic outfit",
            ],
        },
        SuggestionCategory {
            name: "Style",
            suggestions: &[
                "anime style", "oil painting", "cyberpunk art", "photorealistic",
                "watercolor", "pixel art", "gothic style", "Disney animation",
                "ink wash painting", "80s retro style", "fantasy art", "low-poly style",
                "film noir", "vaporwave",
            ],
        },
    ]
});

pub fn suggestion_catalog() -> &'static [SuggestionCategory] {
    &CATALOG
}
