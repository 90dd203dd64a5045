pub mod battle_repo;
