pub mod core;
pub mod results;
pub mod index;
pub mod scoring;
pub mod query;
pub mod search;
pub mod parallel;

/*
Layering, leaf to root:

  core            ids and the error type
  results         token locations, per-field matches, the merge algebra
  index           navigator contract, snapshot metadata, in-memory trie
  scoring         scorer trait used by the in-memory index
  query           query part tree and evaluation context
  search          word / fuzzy / wildcard engines, ranked executor
  parallel        batch evaluation over one snapshot

Evaluating a query part walks its tree left to right, driving fresh
navigators from the index snapshot and merging per-document, per-field
location sets with the operators in results::merge. Snapshots are immutable
during evaluation, so independent queries may run on separate threads.
*/
