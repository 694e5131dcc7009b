// Traindesk
// Copyright 2025 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Trivial templating engine.

/// Expands the `%key%` placeholders in `template` with the values in `replacements`.
///
/// Every placeholder key must appear exactly once in `replacements`, and a literal percent sign
/// is written as `%%`.  Values are inserted verbatim so they cannot introduce new placeholders.
/// Templates are static by design and a malformed one is a programming error, hence the panics.
pub fn apply(template: &'static str, replacements: &[(&'static str, &str)]) -> String {
    let lookup = |key: &str| -> &str {
        let mut matches = replacements.iter().filter(|(candidate, _)| *candidate == key);
        let (_, value) =
            matches.next().unwrap_or_else(|| panic!("No replacement for key {}", key));
        assert!(matches.next().is_none(), "Multiple replacements for key {}", key);
        value
    };

    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(0) => {
                output.push('%');
                rest = &after[1..];
            }
            Some(end) => {
                output.push_str(lookup(&after[..end]));
                rest = &after[end + 1..];
            }
            None => panic!("Unterminated placeholder in template: {}", template),
        }
    }
    output.push_str(rest);
    output
}
